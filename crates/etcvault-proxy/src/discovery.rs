//! Backend discovery sources.
//!
//! Two concrete [`BackendSource`] implementations: one queries a fixed set
//! of candidate URLs through the etcd members API, the other resolves the
//! cluster from DNS SRV records first. The router treats both as opaque.

use std::sync::Arc;

use async_trait::async_trait;
use hickory_resolver::TokioAsyncResolver;
use serde::Deserialize;
use tracing::{debug, warn};
use url::Url;

use crate::backend::Backend;
use crate::error::DiscoveryError;
use crate::router::BackendSource;

/// One member as reported by the etcd members API. Only the client URLs
/// matter to the proxy.
#[derive(Debug, Deserialize)]
struct EtcdMember {
    #[serde(rename = "clientURLs", default)]
    client_urls: Vec<String>,
}

/// The `/v2/members` document wraps the member array; the peer-port
/// `/members` endpoint returns the bare array.
#[derive(Debug, Deserialize)]
struct EtcdMembers {
    #[serde(default)]
    members: Vec<EtcdMember>,
}

/// Discover backends by asking fixed candidate URLs for the member list.
pub struct MembersDiscovery {
    client: reqwest::Client,
    urls: Vec<Url>,
}

impl MembersDiscovery {
    #[must_use]
    pub fn new(client: reqwest::Client, urls: Vec<Url>) -> Self {
        MembersDiscovery { client, urls }
    }
}

#[async_trait]
impl BackendSource for MembersDiscovery {
    async fn discover(&self) -> Result<Vec<Arc<Backend>>, DiscoveryError> {
        Ok(fetch_members(&self.client, &self.urls, "/v2/members", true).await)
    }
}

/// Discover backends from `_etcd-server._tcp.<domain>` /
/// `_etcd-server-ssl._tcp.<domain>` SRV records, then ask the resolved
/// peers for the member list.
pub struct SrvDiscovery {
    client: reqwest::Client,
    resolver: TokioAsyncResolver,
    domain: String,
}

impl SrvDiscovery {
    /// Build a discovery source using the system resolver configuration.
    pub fn new(client: reqwest::Client, domain: String) -> Result<Self, DiscoveryError> {
        let resolver =
            TokioAsyncResolver::tokio_from_system_conf().map_err(|source| DiscoveryError::Srv {
                domain: domain.clone(),
                source,
            })?;
        Ok(SrvDiscovery {
            client,
            resolver,
            domain,
        })
    }

    async fn srv_urls(&self, service: &str, scheme: &str) -> Option<Vec<Url>> {
        let name = format!("{service}.{}.", self.domain);
        match self.resolver.srv_lookup(name.clone()).await {
            Ok(lookup) => {
                let mut urls = Vec::new();
                for record in lookup.iter() {
                    let target = record.target().to_string();
                    let host = target.trim_end_matches('.');
                    let text = format!("{scheme}://{host}:{}", record.port());
                    match Url::parse(&text) {
                        Ok(url) => urls.push(url),
                        Err(err) => {
                            warn!(url = %text, error = %err, "skipping unparseable srv target");
                        }
                    }
                }
                Some(urls)
            }
            Err(err) => {
                warn!(name = %name, error = %err, "srv lookup failed");
                None
            }
        }
    }
}

#[async_trait]
impl BackendSource for SrvDiscovery {
    async fn discover(&self) -> Result<Vec<Arc<Backend>>, DiscoveryError> {
        let plain = self.srv_urls("_etcd-server._tcp", "http").await;
        let ssl = self.srv_urls("_etcd-server-ssl._tcp", "https").await;

        if plain.is_none() && ssl.is_none() {
            // Re-resolve just to surface a concrete error for the log.
            let name = format!("_etcd-server._tcp.{}.", self.domain);
            let source = match self.resolver.srv_lookup(name).await {
                Err(err) => err,
                // The record appeared between the two lookups — return
                // empty and let the next refresh pick it up.
                Ok(_) => return Ok(Vec::new()),
            };
            return Err(DiscoveryError::Srv {
                domain: self.domain.clone(),
                source,
            });
        }

        // SSL entries are preferred by emitting them first.
        let mut urls = ssl.unwrap_or_default();
        urls.extend(plain.unwrap_or_default());

        Ok(fetch_members(&self.client, &urls, "/members", false).await)
    }
}

/// Ask each candidate URL for the member list; the first one that answers
/// with a parseable document wins. All candidates failing yields an empty
/// list (the router keeps its previous list only on `Err`, and an empty
/// cluster is an answer, not an error).
async fn fetch_members(
    client: &reqwest::Client,
    urls: &[Url],
    path: &str,
    wrapped: bool,
) -> Vec<Arc<Backend>> {
    for base in urls {
        let mut target = base.clone();
        target.set_path(path);

        let response = match client.get(target.clone()).send().await {
            Ok(response) => response,
            Err(err) => {
                warn!(url = %target, error = %err, "error when retrieving members");
                continue;
            }
        };

        let body = match response.bytes().await {
            Ok(body) => body,
            Err(err) => {
                warn!(url = %target, error = %err, "error reading members response");
                continue;
            }
        };

        let members = if wrapped {
            serde_json::from_slice::<EtcdMembers>(&body).map(|doc| doc.members)
        } else {
            serde_json::from_slice::<Vec<EtcdMember>>(&body)
        };
        let members = match members {
            Ok(members) => members,
            Err(err) => {
                warn!(url = %target, error = %err, "error parsing members response");
                continue;
            }
        };

        let backends: Vec<Arc<Backend>> = members
            .iter()
            .filter_map(|member| member.client_urls.first())
            .filter_map(|client_url| match Url::parse(client_url) {
                Ok(url) => Some(Backend::new(url)),
                Err(err) => {
                    warn!(url = %client_url, error = %err, "skipping member with unparseable client url");
                    None
                }
            })
            .collect();

        debug!(url = %target, count = backends.len(), "discovered backends");
        return backends;
    }

    Vec::new()
}
