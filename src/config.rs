// =============================================================================
// config.rs — THE KNOBS
// =============================================================================
//
// As configuration goes, this is a garden shed:
// a TTL per keyword domain, whether the transaction domain checks its source
// before rebuilding, case sensitivity, and where the binary finds its
// keyword tables.
//
// Everything can be overridden via KEYWORD_ENGINE_* environment variables
// (or a .env file). Unparseable values fall back to the defaults.
// =============================================================================

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::cache::CachePolicy;
use crate::models::Domain;

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// How long a transaction-method automaton is served before the
    /// keyword table is consulted again.
    /// Default: 300 seconds. Operators tune these phrases often.
    pub transaction_ttl: Duration,

    /// Default: 3600 seconds.
    pub restricted_ttl: Duration,

    /// Default: 3600 seconds. Places rarely move.
    pub geography_ttl: Duration,

    /// When the transaction cache expires, compare the freshly fetched
    /// phrases with the ones the current automaton was built from and skip
    /// the rebuild if nothing changed.
    /// Default: true
    pub transaction_verify_source: bool,

    /// Default: false (matching ignores case).
    pub case_sensitive: bool,

    /// Directory holding the JSON keyword tables for the binary.
    /// Default: ./keywords
    pub keyword_dir: PathBuf,

    /// Messages analyzed per parallel batch by the binary.
    /// Default: 256
    pub batch_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            transaction_ttl: Duration::from_secs(300),
            restricted_ttl: Duration::from_secs(3600),
            geography_ttl: Duration::from_secs(3600),
            transaction_verify_source: true,
            case_sensitive: false,
            keyword_dir: PathBuf::from("keywords"),
            batch_size: 256,
        }
    }
}

impl Config {
    /// Load configuration from the environment, reading `.env` first if
    /// there is one.
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();
        let defaults = Config::default();

        Config {
            transaction_ttl: Duration::from_secs(
                env_or_default("KEYWORD_ENGINE_TRANSACTION_TTL_SECS", "300")
                    .parse()
                    .unwrap_or(defaults.transaction_ttl.as_secs()),
            ),
            restricted_ttl: Duration::from_secs(
                env_or_default("KEYWORD_ENGINE_RESTRICTED_TTL_SECS", "3600")
                    .parse()
                    .unwrap_or(defaults.restricted_ttl.as_secs()),
            ),
            geography_ttl: Duration::from_secs(
                env_or_default("KEYWORD_ENGINE_GEOGRAPHY_TTL_SECS", "3600")
                    .parse()
                    .unwrap_or(defaults.geography_ttl.as_secs()),
            ),
            transaction_verify_source: parse_bool(
                &env_or_default("KEYWORD_ENGINE_TRANSACTION_VERIFY_SOURCE", "true"),
            )
            .unwrap_or(defaults.transaction_verify_source),
            case_sensitive: parse_bool(&env_or_default("KEYWORD_ENGINE_CASE_SENSITIVE", "false"))
                .unwrap_or(defaults.case_sensitive),
            keyword_dir: PathBuf::from(env_or_default("KEYWORD_ENGINE_KEYWORD_DIR", "keywords")),
            batch_size: env_or_default("KEYWORD_ENGINE_BATCH_SIZE", "256")
                .parse()
                .ok()
                .filter(|size: &usize| *size > 0)
                .unwrap_or(defaults.batch_size),
        }
    }

    /// Cache policy for one domain.
    pub fn policy(&self, domain: Domain) -> CachePolicy {
        match domain {
            Domain::TransactionMethod => CachePolicy {
                ttl: self.transaction_ttl,
                verify_source: self.transaction_verify_source,
                case_sensitive: self.case_sensitive,
            },
            Domain::Restricted => CachePolicy {
                ttl: self.restricted_ttl,
                verify_source: false,
                case_sensitive: self.case_sensitive,
            },
            Domain::Geography => CachePolicy {
                ttl: self.geography_ttl,
                verify_source: false,
                case_sensitive: self.case_sensitive,
            },
        }
    }
}

fn env_or_default(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policies() {
        let config = Config::default();

        let transaction = config.policy(Domain::TransactionMethod);
        assert_eq!(transaction.ttl, Duration::from_secs(300));
        assert!(transaction.verify_source);
        assert!(!transaction.case_sensitive);

        let restricted = config.policy(Domain::Restricted);
        assert_eq!(restricted.ttl, Duration::from_secs(3600));
        assert!(!restricted.verify_source);

        assert_eq!(config.policy(Domain::Geography).ttl, Duration::from_secs(3600));
    }

    #[test]
    fn test_case_sensitivity_applies_to_every_domain() {
        let config = Config {
            case_sensitive: true,
            ..Config::default()
        };
        for domain in Domain::ALL {
            assert!(config.policy(domain).case_sensitive);
        }
    }

    #[test]
    fn test_parse_bool() {
        assert_eq!(parse_bool("TRUE"), Some(true));
        assert_eq!(parse_bool(" off "), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }
}
