/// Email address and domain helpers shared by the detection modules and
/// the policy engine.
pub struct DomainUtils;

impl DomainUtils {
    /// Extract the domain part of an email address, lowercased.
    pub fn extract_domain(email: &str) -> Option<String> {
        email.split('@').nth(1).map(|s| s.trim().to_lowercase())
    }

    /// Check if a domain matches any entry in the list, including
    /// subdomains (mail.example.com matches example.com).
    pub fn matches_domain_list(domain: &str, domain_list: &[String]) -> bool {
        let domain_lower = domain.to_lowercase();

        for pattern in domain_list {
            let pattern_lower = pattern.to_lowercase();

            if domain_lower == pattern_lower {
                return true;
            }

            if domain_lower.ends_with(&format!(".{}", pattern_lower)) {
                return true;
            }
        }

        false
    }

    /// A recipient is external when its domain differs from the sender's.
    /// Addresses without a parseable domain are treated as internal so a
    /// malformed address cannot fire external-recipient heuristics.
    pub fn is_external_recipient(from_address: &str, to_address: &str) -> bool {
        match (
            Self::extract_domain(from_address),
            Self::extract_domain(to_address),
        ) {
            (Some(from_domain), Some(to_domain)) => from_domain != to_domain,
            _ => false,
        }
    }
}
