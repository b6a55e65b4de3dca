// Copyright 2025 Kirky.X
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use axum::extract::FromRequestParts;
use axum::http::header::USER_AGENT;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use std::convert::Infallible;

const UNKNOWN: &str = "unknown";

/// 请求方信息
///
/// 只用于审计，不参与任何鉴权判断
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientInfo {
    pub requester_ip: String,
    pub user_agent: String,
}

impl ClientInfo {
    /// 从请求头中解析
    ///
    /// IP 依次取 `x-forwarded-for` 的第一项、`x-real-ip`，都没有时为 `unknown`
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let requester_ip = header_value(headers, "x-forwarded-for")
            .and_then(|value| value.split(',').next())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .or_else(|| header_value(headers, "x-real-ip"))
            .unwrap_or(UNKNOWN)
            .to_string();

        let user_agent = header_value(headers, USER_AGENT.as_str())
            .unwrap_or(UNKNOWN)
            .to_string();

        Self {
            requester_ip,
            user_agent,
        }
    }
}

fn header_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

impl<S> FromRequestParts<S> for ClientInfo
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(ClientInfo::from_headers(&parts.headers))
    }
}
