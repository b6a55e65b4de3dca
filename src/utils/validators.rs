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

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use thiserror::Error;
use url::{Host, Url};

/// 验证错误类型
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ValidationError {
    /// URL无法解析或缺少主机
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
    /// 仅支持 http 和 https
    #[error("Unsupported URL scheme: {0}")]
    UnsupportedScheme(String),
    /// 主机解析到私有或回环地址
    #[error("SSRF protection: address {0} is not allowed")]
    SsrfDetected(IpAddr),
}

/// 图片地址的访问策略
#[derive(Debug, Clone, Default)]
pub struct ImageHostPolicy {
    /// 为 true 时跳过全部地址检查
    pub allow_private_hosts: bool,
    /// 免于地址检查的来源（`scheme://host:port`）
    pub trusted_origins: Vec<String>,
}

impl ImageHostPolicy {
    fn trusts(&self, url: &Url) -> bool {
        if self.allow_private_hosts {
            return true;
        }
        let origin = url.origin().ascii_serialization();
        self.trusted_origins
            .iter()
            .any(|trusted| trusted.trim_end_matches('/').eq_ignore_ascii_case(&origin))
    }
}

/// 通过检查的图片地址
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageTarget {
    pub url: Url,
    /// 域名主机检查时解析出的地址，请求时固定使用这些地址；
    /// IP 字面量或免检来源时为空
    pub pinned_addrs: Vec<SocketAddr>,
}

/// 检查IP地址是否可以公开访问
///
/// # 参数
///
/// * `ip` - IP地址
///
/// # 返回值
///
/// 如果IP地址是安全的则返回true，否则返回false
pub fn is_safe_ip(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(ipv4) => is_safe_ipv4(ipv4),
        IpAddr::V6(ipv6) => is_safe_ipv6(ipv6),
    }
}

fn is_safe_ipv4(ip: Ipv4Addr) -> bool {
    let [a, b, c, _] = ip.octets();
    !(ip.is_loopback()
        || ip.is_private()
        || ip.is_link_local()
        || ip.is_broadcast()
        || ip.is_documentation()
        || ip.is_multicast()
        // 0.0.0.0/8
        || a == 0
        // 100.64.0.0/10 carrier-grade NAT
        || (a == 100 && (b & 0xc0) == 64)
        // 192.0.0.0/24 protocol assignments
        || (a == 192 && b == 0 && c == 0)
        // 198.18.0.0/15 benchmarking
        || (a == 198 && (b & 0xfe) == 18)
        // 240.0.0.0/4 reserved
        || a >= 240)
}

fn is_safe_ipv6(ip: Ipv6Addr) -> bool {
    let segments = ip.segments();
    if ip.is_loopback() || ip.is_unspecified() {
        return false;
    }
    // ::ffff:0:0/96 mapped and ::/96 compatible addresses
    if let Some(v4) = ip.to_ipv4() {
        return is_safe_ipv4(v4);
    }
    // 64:ff9b::/96 NAT64
    if segments[..6] == [0x64, 0xff9b, 0, 0, 0, 0] {
        let [_, _, _, _, _, _, hi, lo] = segments;
        return is_safe_ipv4(Ipv4Addr::from(((hi as u32) << 16) | lo as u32));
    }
    let first = segments[0];
    // ff00::/8 multicast, fc00::/7 unique local, fe80::/10 link local, 2001:db8::/32 documentation
    !((first & 0xff00) == 0xff00
        || (first & 0xfe00) == 0xfc00
        || (first & 0xffc0) == 0xfe80
        || (first == 0x2001 && segments[1] == 0x0db8))
}

/// 解析并检查图片地址
///
/// # 参数
///
/// * `raw` - 调用方提供的URL字符串，或重定向的目标地址
/// * `policy` - 地址访问策略
///
/// # 返回值
///
/// * `Ok(ImageTarget)` - 可以访问的URL及其固定的解析结果
/// * `Err(ValidationError)` - URL无效或存在安全风险
pub async fn validate_image_url(
    raw: &str,
    policy: &ImageHostPolicy,
) -> Result<ImageTarget, ValidationError> {
    let parsed = Url::parse(raw.trim()).map_err(|e| ValidationError::InvalidUrl(e.to_string()))?;

    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return Err(ValidationError::UnsupportedScheme(parsed.scheme().to_string()));
    }

    if parsed.host().is_none() {
        return Err(ValidationError::InvalidUrl("missing host".to_string()));
    }

    if policy.trusts(&parsed) {
        return Ok(ImageTarget {
            url: parsed,
            pinned_addrs: Vec::new(),
        });
    }

    let (addrs, pinned_addrs): (Vec<IpAddr>, Vec<SocketAddr>) = match parsed.host() {
        None => (Vec::new(), Vec::new()),
        Some(Host::Ipv4(ip)) => (vec![IpAddr::V4(ip)], Vec::new()),
        Some(Host::Ipv6(ip)) => (vec![IpAddr::V6(ip)], Vec::new()),
        Some(Host::Domain(domain)) => {
            let port = parsed.port_or_known_default().unwrap_or(80);
            let resolved: Vec<SocketAddr> = tokio::net::lookup_host((domain, port))
                .await
                .map_err(|e| ValidationError::InvalidUrl(e.to_string()))?
                .collect();
            if resolved.is_empty() {
                return Err(ValidationError::InvalidUrl(format!(
                    "{} did not resolve",
                    domain
                )));
            }
            (resolved.iter().map(SocketAddr::ip).collect(), resolved)
        }
    };

    if let Some(blocked) = addrs.into_iter().find(|ip| !is_safe_ip(*ip)) {
        return Err(ValidationError::SsrfDetected(blocked));
    }

    Ok(ImageTarget {
        url: parsed,
        pinned_addrs,
    })
}
