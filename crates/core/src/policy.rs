// crates/core/src/policy.rs
//! Per-site download policy.
//!
//! Some gallery sites ship their real content as images next to the video
//! player. For those hosts a universal-script run that produced images is a
//! success even when its video step failed. The host list is configuration,
//! not a hardcoded site name.

/// Site-specific success policy for the universal extraction stage.
#[derive(Debug, Clone)]
pub struct SitePolicy {
    supplement_hosts: Vec<String>,
}

impl SitePolicy {
    /// Policy with the given supplement hosts (matched as lowercase substrings).
    pub fn new(hosts: impl IntoIterator<Item = String>) -> Self {
        Self {
            supplement_hosts: hosts
                .into_iter()
                .map(|h| h.trim().to_ascii_lowercase())
                .filter(|h| !h.is_empty())
                .collect(),
        }
    }

    /// Policy with no supplement hosts.
    pub fn none() -> Self {
        Self { supplement_hosts: Vec::new() }
    }

    /// Whether images found after a failed stage-1 run count as success for `url`.
    pub fn allows_image_supplement(&self, url: &str) -> bool {
        let url = url.to_ascii_lowercase();
        self.supplement_hosts.iter().any(|h| url.contains(h))
    }
}

impl Default for SitePolicy {
    fn default() -> Self {
        Self::new(["erome.com".to_string()])
    }
}
