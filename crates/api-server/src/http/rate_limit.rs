use std::collections::{HashMap, HashSet, VecDeque};
use std::net::{IpAddr, SocketAddr};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use axum::extract::{ConnectInfo, Request, State};
use axum::http::Method;
use axum::middleware::Next;
use axum::response::Response;
use tracing::warn;

use super::AppState;
use super::errors::too_many_requests_response;

/// Longest window any endpoint uses; the pruner drops anything older.
const LONGEST_WINDOW: Duration = Duration::from_secs(60);

/// Write endpoints of the chat surface that are throttled per client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum ChatEndpoint {
    Send,
    Purge,
}

#[derive(Debug, Clone, Copy)]
struct WindowPolicy {
    limit: usize,
    window: Duration,
}

/// Who a request is charged to. Requests without a peer address (in-process
/// callers, tests) share one bucket.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Client {
    Ip(IpAddr),
    Anonymous,
}

type Hits = HashMap<(ChatEndpoint, Client), VecDeque<Instant>>;

#[derive(Clone, Default)]
pub struct RateLimiter {
    hits: Arc<Mutex<Hits>>,
}

impl ChatEndpoint {
    fn classify(method: &Method, path: &str) -> Option<Self> {
        if path != "/chat" {
            return None;
        }
        if method == Method::POST {
            Some(Self::Send)
        } else if method == Method::DELETE {
            Some(Self::Purge)
        } else {
            None
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::Send => "POST /chat",
            Self::Purge => "DELETE /chat",
        }
    }

    fn policy(self) -> WindowPolicy {
        let limit = match self {
            Self::Send => 20,
            Self::Purge => 10,
        };
        WindowPolicy {
            limit,
            window: LONGEST_WINDOW,
        }
    }
}

impl RateLimiter {
    /// Periodically forgets clients that have gone quiet.
    pub fn spawn_pruner(&self, every: Duration) -> tokio::task::JoinHandle<()> {
        let hits = Arc::clone(&self.hits);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            loop {
                ticker.tick().await;
                forget_idle(&hits, Instant::now());
            }
        })
    }

    /// Records the hit and returns `Ok`, or returns the seconds until a slot frees up.
    fn admit(&self, endpoint: ChatEndpoint, client: Client, now: Instant) -> Result<(), u64> {
        let policy = endpoint.policy();
        let cutoff = now.checked_sub(policy.window).unwrap_or(now);

        let mut hits = lock(&self.hits);
        let recent = hits.entry((endpoint, client)).or_default();
        drop_older_than(recent, cutoff);

        if recent.len() < policy.limit {
            recent.push_back(now);
            return Ok(());
        }

        let retry_after = recent
            .front()
            .map(|oldest| policy.window.saturating_sub(now.saturating_duration_since(*oldest)))
            .unwrap_or(policy.window);
        Err(retry_after.as_secs().max(1))
    }
}

fn lock(hits: &Mutex<Hits>) -> MutexGuard<'_, Hits> {
    hits.lock().unwrap_or_else(PoisonError::into_inner)
}

fn forget_idle(hits: &Mutex<Hits>, now: Instant) {
    let cutoff = now.checked_sub(LONGEST_WINDOW).unwrap_or(now);
    lock(hits).retain(|_, recent| {
        drop_older_than(recent, cutoff);
        !recent.is_empty()
    });
}

fn drop_older_than(recent: &mut VecDeque<Instant>, cutoff: Instant) {
    while recent.front().is_some_and(|seen| *seen <= cutoff) {
        recent.pop_front();
    }
}

pub(super) async fn chat_rate_limit_middleware(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Response {
    let Some(endpoint) = ChatEndpoint::classify(req.method(), req.uri().path()) else {
        return next.run(req).await;
    };

    let client = client_of(&req, &state.trusted_proxy_ips);
    match state.rate_limiter.admit(endpoint, client, Instant::now()) {
        Ok(()) => next.run(req).await,
        Err(retry_after_seconds) => {
            warn!(
                endpoint = endpoint.label(),
                retry_after_seconds, "chat request throttled"
            );
            too_many_requests_response(retry_after_seconds)
        }
    }
}

/// The socket peer, unless the peer is a trusted proxy; then the nearest
/// untrusted hop of `x-forwarded-for`.
fn client_of(req: &Request, trusted_proxies: &HashSet<IpAddr>) -> Client {
    let Some(ConnectInfo(peer)) = req.extensions().get::<ConnectInfo<SocketAddr>>() else {
        return Client::Anonymous;
    };
    let peer_ip = peer.ip();
    if !trusted_proxies.contains(&peer_ip) {
        return Client::Ip(peer_ip);
    }

    let forwarded = req
        .headers()
        .get_all("x-forwarded-for")
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|raw| raw.split(','))
        .filter_map(|hop| hop.trim().parse::<IpAddr>().ok())
        .collect::<Vec<_>>();

    let origin = forwarded
        .into_iter()
        .rev()
        .find(|hop| !trusted_proxies.contains(hop))
        .unwrap_or(peer_ip);
    Client::Ip(origin)
}
