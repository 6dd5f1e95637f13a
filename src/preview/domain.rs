use url::Host;

use super::errors::PreviewError;
use super::request::TargetUrl;

/// Registrable domain of a target URL together with its second-level label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RootDomain {
    pub domain: String,
    pub label: String,
}

impl RootDomain {
    pub fn from_target(target: &TargetUrl) -> Result<Self, PreviewError> {
        match target.as_url().host() {
            Some(Host::Domain(host)) => Self::from_host(host),
            Some(Host::Ipv4(ip)) => Err(PreviewError::DomainParseError(format!(
                "{ip} is an ip address"
            ))),
            Some(Host::Ipv6(ip)) => Err(PreviewError::DomainParseError(format!(
                "{ip} is an ip address"
            ))),
            None => Err(PreviewError::DomainParseError("url has no host".into())),
        }
    }

    pub fn from_host(host: &str) -> Result<Self, PreviewError> {
        let host = host.trim_end_matches('.').to_lowercase();

        if host.is_empty()
            || host
                .split('.')
                .any(|label| label.is_empty() || label.len() > 63)
        {
            return Err(PreviewError::DomainParseError(host));
        }

        let domain = psl::domain_str(&host)
            .ok_or_else(|| PreviewError::RootDomainNotFound(host.clone()))?
            .to_string();

        let suffix = psl::suffix_str(&domain)
            .ok_or_else(|| PreviewError::DomainParseError(domain.clone()))?;

        let label = domain
            .strip_suffix(suffix)
            .map(|rest| rest.trim_end_matches('.'))
            .unwrap_or_default()
            .to_string();

        if label.is_empty() {
            return Err(PreviewError::SldNotFound(domain));
        }

        Ok(Self { domain, label })
    }
}
