//! DNS lookups for ingress rules
//!
//! [`DnsResolver`] wraps a [`DnsLookup`] with a per-lookup timeout and a
//! bounded cache, so a host shared by many ingresses is resolved once per run.

use async_trait::async_trait;
use hickory_resolver::config::{ResolverConfig, ResolverOpts};
use hickory_resolver::error::{ResolveError, ResolveErrorKind};
use hickory_resolver::TokioAsyncResolver;
use std::collections::{HashMap, VecDeque};
use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_CACHE_SIZE: usize = 512;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DnsError {
    #[error("lookup of {host} failed: {reason}")]
    Lookup { host: String, reason: String },

    #[error("lookup of {host} timed out")]
    Timeout { host: String },

    #[error("received no results from lookup of {host}")]
    NoRecords { host: String },
}

/// Record lookups against a name server
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DnsLookup: Send + Sync {
    async fn lookup_ipv4(&self, host: &str) -> Result<Vec<Ipv4Addr>, DnsError>;

    /// TXT records, one string per record
    async fn lookup_txt(&self, host: &str) -> Result<Vec<String>, DnsError>;
}

/// [`DnsLookup`] backed by the system resolver configuration
pub struct HickoryLookup {
    resolver: TokioAsyncResolver,
}

impl HickoryLookup {
    /// Use the system configuration, falling back to Cloudflare's resolvers
    pub fn from_system() -> Self {
        let resolver = TokioAsyncResolver::tokio_from_system_conf().unwrap_or_else(|e| {
            tracing::warn!("Could not read system resolver config, using 1.1.1.1: {}", e);
            TokioAsyncResolver::tokio(ResolverConfig::cloudflare(), ResolverOpts::default())
        });
        Self { resolver }
    }

    fn error(host: &str, err: ResolveError) -> DnsError {
        match err.kind() {
            ResolveErrorKind::NoRecordsFound { .. } => DnsError::NoRecords {
                host: host.to_string(),
            },
            _ => DnsError::Lookup {
                host: host.to_string(),
                reason: err.to_string(),
            },
        }
    }
}

fn fqdn(host: &str) -> String {
    if host.ends_with('.') {
        host.to_string()
    } else {
        format!("{}.", host)
    }
}

#[async_trait]
impl DnsLookup for HickoryLookup {
    async fn lookup_ipv4(&self, host: &str) -> Result<Vec<Ipv4Addr>, DnsError> {
        let lookup = self
            .resolver
            .ipv4_lookup(fqdn(host))
            .await
            .map_err(|e| Self::error(host, e))?;
        Ok(lookup.iter().map(|record| record.0).collect())
    }

    async fn lookup_txt(&self, host: &str) -> Result<Vec<String>, DnsError> {
        let lookup = self
            .resolver
            .txt_lookup(fqdn(host))
            .await
            .map_err(|e| Self::error(host, e))?;
        Ok(lookup
            .iter()
            .map(|record| {
                record
                    .txt_data()
                    .iter()
                    .map(|chunk| String::from_utf8_lossy(chunk).into_owned())
                    .collect::<String>()
            })
            .collect())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Query {
    Ipv4(String),
    Txt(String),
}

#[derive(Debug, Clone)]
enum Answer {
    Ipv4(Vec<Ipv4Addr>),
    Txt(Vec<String>),
}

/// Insertion ordered cache that evicts its oldest entry when full
#[derive(Debug)]
struct Cache {
    capacity: usize,
    order: VecDeque<Query>,
    entries: HashMap<Query, Answer>,
}

impl Cache {
    fn new(capacity: usize) -> Self {
        Self {
            capacity,
            order: VecDeque::new(),
            entries: HashMap::new(),
        }
    }

    fn get(&self, query: &Query) -> Option<&Answer> {
        self.entries.get(query)
    }

    fn insert(&mut self, query: Query, answer: Answer) {
        if self.capacity == 0 {
            return;
        }
        if self.entries.insert(query.clone(), answer).is_some() {
            return;
        }
        self.order.push_back(query);
        while self.order.len() > self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.entries.remove(&oldest);
            }
        }
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Caching, time-bounded resolver shared by the DNS rules
pub struct DnsResolver {
    lookup: Arc<dyn DnsLookup>,
    timeout: Duration,
    cache: Mutex<Cache>,
}

impl DnsResolver {
    pub fn new(lookup: Arc<dyn DnsLookup>) -> Self {
        Self {
            lookup,
            timeout: DEFAULT_TIMEOUT,
            cache: Mutex::new(Cache::new(DEFAULT_CACHE_SIZE)),
        }
    }

    /// Resolver using the system configuration
    pub fn system() -> Self {
        Self::new(Arc::new(HickoryLookup::from_system()))
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_cache_size(mut self, size: usize) -> Self {
        self.cache = Mutex::new(Cache::new(size));
        self
    }

    /// IPv4 addresses of a host
    ///
    /// Only successful answers are cached.
    pub async fn ipv4(&self, host: &str) -> Result<Vec<Ipv4Addr>, DnsError> {
        let query = Query::Ipv4(host.to_string());
        if let Some(Answer::Ipv4(ips)) = self.cache.lock().await.get(&query) {
            return Ok(ips.clone());
        }

        let ips = tokio::time::timeout(self.timeout, self.lookup.lookup_ipv4(host))
            .await
            .map_err(|_| DnsError::Timeout {
                host: host.to_string(),
            })??;
        if ips.is_empty() {
            return Err(DnsError::NoRecords {
                host: host.to_string(),
            });
        }

        self.cache
            .lock()
            .await
            .insert(query, Answer::Ipv4(ips.clone()));
        Ok(ips)
    }

    /// TXT records of a host
    pub async fn txt(&self, host: &str) -> Result<Vec<String>, DnsError> {
        let query = Query::Txt(host.to_string());
        if let Some(Answer::Txt(records)) = self.cache.lock().await.get(&query) {
            return Ok(records.clone());
        }

        let records = tokio::time::timeout(self.timeout, self.lookup.lookup_txt(host))
            .await
            .map_err(|_| DnsError::Timeout {
                host: host.to_string(),
            })??;
        if records.is_empty() {
            return Err(DnsError::NoRecords {
                host: host.to_string(),
            });
        }

        self.cache
            .lock()
            .await
            .insert(query, Answer::Txt(records.clone()));
        Ok(records)
    }

    pub async fn cached(&self) -> usize {
        self.cache.lock().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fqdn() {
        assert_eq!(fqdn("example.com"), "example.com.");
        assert_eq!(fqdn("example.com."), "example.com.");
    }

    #[test]
    fn test_cache_evicts_oldest() {
        let mut cache = Cache::new(2);
        for host in ["a", "b", "c"] {
            cache.insert(Query::Txt(host.into()), Answer::Txt(vec![host.into()]));
        }
        assert_eq!(cache.len(), 2);
        assert!(cache.get(&Query::Txt("a".into())).is_none());
        assert!(cache.get(&Query::Txt("c".into())).is_some());
    }

    #[tokio::test]
    async fn test_answers_are_cached() {
        let mut lookup = MockDnsLookup::new();
        lookup
            .expect_lookup_ipv4()
            .times(1)
            .returning(|_| Ok(vec![Ipv4Addr::new(10, 0, 0, 1)]));
        let resolver = DnsResolver::new(Arc::new(lookup));

        for _ in 0..3 {
            let ips = resolver.ipv4("app.example.com").await.unwrap();
            assert_eq!(ips, vec![Ipv4Addr::new(10, 0, 0, 1)]);
        }
        assert_eq!(resolver.cached().await, 1);
    }

    #[tokio::test]
    async fn test_errors_are_not_cached() {
        let mut lookup = MockDnsLookup::new();
        lookup.expect_lookup_txt().times(2).returning(|host| {
            Err(DnsError::Lookup {
                host: host.to_string(),
                reason: "refused".into(),
            })
        });
        let resolver = DnsResolver::new(Arc::new(lookup));

        assert!(resolver.txt("app.example.com").await.is_err());
        assert!(resolver.txt("app.example.com").await.is_err());
        assert_eq!(resolver.cached().await, 0);
    }

    #[tokio::test]
    async fn test_empty_answer_is_no_records() {
        let mut lookup = MockDnsLookup::new();
        lookup.expect_lookup_ipv4().returning(|_| Ok(Vec::new()));
        let resolver = DnsResolver::new(Arc::new(lookup));

        let err = resolver.ipv4("app.example.com").await.unwrap_err();
        assert_eq!(
            err,
            DnsError::NoRecords {
                host: "app.example.com".into()
            }
        );
    }
}
