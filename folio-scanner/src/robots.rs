use crate::config::HttpSettings;
use crate::error::{Result, ScanError};
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

/// Outcome of reading a site's crawl-permission document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompliancePolicy {
    pub denied: bool,
    pub crawl_delay: Option<Duration>,
}

impl CompliancePolicy {
    pub fn permissive() -> Self {
        Self::default()
    }
}

#[derive(Debug, Default)]
struct Group {
    agents: Vec<String>,
    disallow: Vec<String>,
    allow: Vec<String>,
    crawl_delay: Option<Duration>,
}

impl Group {
    fn is_wildcard(&self) -> bool {
        self.agents.iter().any(|a| a == "*")
    }
}

/// Parses a robots.txt body into the policy that applies to all agents.
pub fn parse_policy(content: &str) -> CompliancePolicy {
    let mut groups: Vec<Group> = Vec::new();
    let mut current = Group::default();
    let mut last_was_agent = false;

    for line in content.lines() {
        let line = line.split('#').next().unwrap_or("").trim();
        if line.is_empty() {
            continue;
        }

        let Some((directive, value)) = line.split_once(':') else {
            continue;
        };
        let directive = directive.trim().to_lowercase();
        let value = value.trim();

        match directive.as_str() {
            "user-agent" => {
                if !last_was_agent {
                    // rules seen before any user-agent line belong to no group
                    let finished = std::mem::take(&mut current);
                    if !finished.agents.is_empty() {
                        groups.push(finished);
                    }
                }
                current.agents.push(value.to_string());
                last_was_agent = true;
                continue;
            }
            "disallow" if !value.is_empty() => current.disallow.push(value.to_string()),
            "allow" if !value.is_empty() => current.allow.push(value.to_string()),
            "crawl-delay" => {
                // out-of-range values are ignored like any other malformed line
                if let Ok(secs) = value.parse::<f64>()
                    && let Ok(delay) = Duration::try_from_secs_f64(secs)
                {
                    current.crawl_delay = Some(delay);
                }
            }
            _ => {}
        }
        last_was_agent = false;
    }
    if !current.agents.is_empty() {
        groups.push(current);
    }

    let mut policy = CompliancePolicy::default();
    for group in groups.iter().filter(|g| g.is_wildcard()) {
        let root_disallowed = group.disallow.iter().any(|p| p == "/" || p == "/*");
        let root_allowed = group.allow.iter().any(|p| p == "/" || p == "/$");
        if root_disallowed && !root_allowed {
            policy.denied = true;
        }
        if group.crawl_delay.is_some() {
            policy.crawl_delay = group.crawl_delay;
        }
    }
    policy
}

/// Fetches and interprets `/robots.txt` before a crawl starts.
///
/// A single best-effort attempt: any transport failure, non-success status or
/// unreadable body permits the crawl.
#[derive(Debug, Clone)]
pub struct ComplianceGate {
    client: Client,
}

impl ComplianceGate {
    pub fn new(settings: &HttpSettings) -> Result<Self> {
        let client = Client::builder()
            .user_agent(settings.user_agent.clone())
            .timeout(settings.robots_timeout())
            .redirect(reqwest::redirect::Policy::limited(3))
            .build()?;
        Ok(Self { client })
    }

    pub fn robots_url(base: &Url) -> Result<Url> {
        let mut robots = base.join("/robots.txt")?;
        robots.set_query(None);
        robots.set_fragment(None);
        Ok(robots)
    }

    pub async fn check(&self, base: &Url) -> CompliancePolicy {
        let robots_url = match Self::robots_url(base) {
            Ok(url) => url,
            Err(e) => {
                warn!("Cannot build robots.txt URL for {}: {}", base, e);
                return CompliancePolicy::permissive();
            }
        };

        debug!("Fetching {}", robots_url);
        let response = match self.client.get(robots_url.clone()).send().await {
            Ok(response) => response,
            Err(e) => {
                warn!("robots.txt unreachable at {} ({}), permitting crawl", robots_url, e);
                return CompliancePolicy::permissive();
            }
        };

        if !response.status().is_success() {
            debug!(
                "robots.txt at {} returned {}, permitting crawl",
                robots_url,
                response.status()
            );
            return CompliancePolicy::permissive();
        }

        match response.text().await {
            Ok(body) => {
                let policy = parse_policy(&body);
                info!(
                    "robots.txt for {}: denied={} crawl_delay={:?}",
                    base.host_str().unwrap_or("unknown"),
                    policy.denied,
                    policy.crawl_delay
                );
                policy
            }
            Err(e) => {
                warn!("Unreadable robots.txt at {} ({}), permitting crawl", robots_url, e);
                CompliancePolicy::permissive()
            }
        }
    }

    /// Runs the check and converts a deny into [`ScanError::ComplianceDenied`].
    pub async fn authorize(&self, base: &Url) -> Result<CompliancePolicy> {
        let policy = self.check(base).await;
        if policy.denied {
            return Err(ScanError::ComplianceDenied(format!(
                "{}/robots.txt",
                base.origin().ascii_serialization()
            )));
        }
        Ok(policy)
    }
}
