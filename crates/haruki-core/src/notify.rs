//! Notification relay: catalog webhook payloads become channel posts

use haruki_api::{Card, MediaKind, NotificationPayload, UserId, View};
use haruki_remote_api::{with_deadline, CatalogClient, IdentityLinker, ViewSink};
use haruki_util::{first_non_empty, DedupGate, OwnerKey};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Per-call bound on enrichment lookups unless overridden
pub const DEFAULT_LOOKUP_TIMEOUT: Duration = Duration::from_secs(60);

const COLOR_DEFAULT: u32 = 0x00adff;
const COLOR_GREEN: u32 = 0x2ecc71;
const COLOR_PURPLE: u32 = 0x9c5db3;
const COLOR_ORANGE: u32 = 0xe67e22;
const COLOR_RED: u32 = 0xe74c3c;
const COLOR_BLUE: u32 = 0x3498db;

const TOTAL_REQUEST_KEYS: &[&str] = &["total_requests", "request_count", "totalRequests"];
const PLEX_LINK_KEYS: &[&str] = &["plex_url", "plex_link", "plex"];

/// Presentation of one event class
struct EventStyle {
    code: &'static str,
    /// Human phrasings some agent templates use instead of the code
    phrases: &'static [&'static str],
    color: u32,
    author: &'static str,
    status: &'static str,
}

const EVENT_STYLES: &[EventStyle] = &[
    EventStyle { code: "MEDIA_AVAILABLE", phrases: &["NOW AVAILABLE"], color: COLOR_GREEN, author: "✅ Media Available", status: "Available" },
    EventStyle { code: "MEDIA_REQUESTED", phrases: &["NEW REQUEST", "MEDIA REQUESTED"], color: COLOR_PURPLE, author: "📥 New Request", status: "Requested" },
    EventStyle { code: "MEDIA_PENDING", phrases: &["PENDING APPROVAL"], color: COLOR_ORANGE, author: "⏳ Pending Approval", status: "Pending" },
    EventStyle { code: "MEDIA_APPROVED", phrases: &["REQUEST APPROVED"], color: COLOR_GREEN, author: "✅ Request Approved", status: "Approved" },
    EventStyle { code: "MEDIA_DECLINED", phrases: &["REQUEST DECLINED"], color: COLOR_RED, author: "❌ Request Declined", status: "Declined" },
    EventStyle { code: "MEDIA_FAILED", phrases: &["REQUEST FAILED"], color: COLOR_RED, author: "❌ Request Failed", status: "Failed" },
    EventStyle { code: "MEDIA_AUTO_APPROVED", phrases: &["REQUEST AUTO-APPROVED"], color: COLOR_GREEN, author: "✅ Request Auto-Approved", status: "Auto-Approved" },
    EventStyle { code: "ISSUE_REPORTED", phrases: &["ISSUE REPORTED"], color: COLOR_ORANGE, author: "⚠️ Issue Reported", status: "Reported" },
    EventStyle { code: "ISSUE_COMMENT", phrases: &["NEW COMMENT"], color: COLOR_BLUE, author: "💬 New Comment", status: "Comment" },
    EventStyle { code: "ISSUE_RESOLVED", phrases: &["ISSUE RESOLVED"], color: COLOR_GREEN, author: "✅ Issue Resolved", status: "Resolved" },
    EventStyle { code: "ISSUE_REOPENED", phrases: &["ISSUE REOPENED"], color: COLOR_ORANGE, author: "⚠️ Issue Reopened", status: "Reopened" },
];

fn event_style(event: &str) -> Option<&'static EventStyle> {
    let upper = event.trim().to_uppercase();
    EVENT_STYLES
        .iter()
        .find(|s| upper == s.code || s.phrases.iter().any(|p| upper.contains(p)))
}

/// Events whose media requesters get mentioned
fn mentions_requesters(event: &str) -> bool {
    let upper = event.trim().to_uppercase();
    matches!(
        upper.as_str(),
        "MEDIA_AVAILABLE" | "MEDIA_APPROVED" | "MEDIA_AUTO_APPROVED" | "MEDIA_REQUESTED"
    ) || upper.contains("REQUEST")
}

fn nonzero(value: &str) -> Option<&str> {
    let value = value.trim();
    (!value.is_empty() && value != "0").then_some(value)
}

fn media_info_value(payload: &NotificationPayload) -> Option<(String, String)> {
    let media = payload.media.as_ref()?;
    let mut lines = Vec::new();
    let tmdb = media.tmdb_id.trim();
    if !tmdb.is_empty() {
        match MediaKind::parse(&media.media_type) {
            Some(kind) => lines.push(format!(
                "**TMDB ID:** [{}](https://www.themoviedb.org/{}/{})",
                tmdb,
                kind.as_str(),
                tmdb
            )),
            None => lines.push(format!("**TMDB ID:** {}", tmdb)),
        }
    }
    let tvdb = media.tvdb_id.trim();
    if !tvdb.is_empty() {
        lines.push(format!(
            "**TVDB ID:** [{}](https://www.thetvdb.com/dereferrer/series/{})",
            tvdb, tvdb
        ));
    }
    if !media.status.trim().is_empty() {
        lines.push(format!("**Status:** {}", media.status));
    }
    if lines.is_empty() {
        return None;
    }
    Some((format!("Media Info: {}", media.media_type), lines.join("\n")))
}

/// Card for a notification, before any enrichment
pub fn notification_card(payload: &NotificationPayload) -> Card {
    let mut card = Card::new(payload.subject.clone(), payload.message.clone()).color(COLOR_DEFAULT);
    if !payload.image.trim().is_empty() {
        card = card.thumbnail(payload.image.clone());
    }
    if let Some((name, value)) = media_info_value(payload) {
        card = card.field(name, value, false);
    }

    if let Some(request) = &payload.request {
        card = card.field(
            "Requested By",
            first_non_empty(&[&request.username, &request.email]),
            true,
        );

        let status = match &payload.media {
            Some(media) if !media.status.trim().is_empty() => media.status.clone(),
            _ if !payload.event.trim().is_empty() => match event_style(&payload.event) {
                Some(style) => style.status.to_string(),
                None => payload.event.clone(),
            },
            _ => "—".to_string(),
        };
        card = card.field("Request Status", status, true);

        let total = payload
            .extra_value(TOTAL_REQUEST_KEYS)
            .and_then(nonzero)
            .or_else(|| nonzero(&request.request_count));
        if let Some(total) = total {
            card = card.field("Total Requests", total, true);
        }
    } else if let Some(issue) = &payload.issue {
        card = card.field(
            "Reported By",
            first_non_empty(&[&issue.username, &issue.email]),
            true,
        );
    }

    if let Some(style) = event_style(&payload.event) {
        card = card.color(style.color).author(style.author);
    }

    if let Some(link) = payload.extra_value(PLEX_LINK_KEYS) {
        let link = link.trim();
        if !link.is_empty() {
            card = card.footer(format!("Plex: {}", link));
            card.url = Some(link.to_string());
        }
    }
    card
}

/// What happened to one inbound notification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayOutcome {
    Posted,
    Suppressed,
    NoChannel,
    Failed,
}

pub struct NotificationRelay {
    gate: DedupGate,
    lookup_timeout: Duration,
    default_channel: Option<String>,
    catalog: Option<Arc<dyn CatalogClient>>,
    identity: Option<Arc<dyn IdentityLinker>>,
    sink: Arc<dyn ViewSink>,
}

impl NotificationRelay {
    pub fn new(
        dedup_window: Duration,
        default_channel: Option<String>,
        catalog: Option<Arc<dyn CatalogClient>>,
        identity: Option<Arc<dyn IdentityLinker>>,
        sink: Arc<dyn ViewSink>,
    ) -> Self {
        Self {
            gate: DedupGate::new(dedup_window),
            lookup_timeout: DEFAULT_LOOKUP_TIMEOUT,
            default_channel,
            catalog,
            identity,
            sink,
        }
    }

    /// Bound each catalog or identity lookup made while enriching a post
    pub fn with_lookup_timeout(mut self, timeout: Duration) -> Self {
        self.lookup_timeout = timeout;
        self
    }

    pub async fn relay(&self, payload: NotificationPayload) -> RelayOutcome {
        let channel = payload
            .channel_id
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .or(self.default_channel.as_deref());
        let Some(channel) = channel.map(str::to_string) else {
            warn!(event = %payload.event, "No channel for notification, dropping");
            return RelayOutcome::NoChannel;
        };

        let key = payload.dedup_key();
        self.gate.cleanup();
        if self.gate.should_suppress(&key) {
            info!(key = %key, "Suppressed duplicate notification");
            return RelayOutcome::Suppressed;
        }

        let mut card = notification_card(&payload);
        let mut mentions = payload.mentioned_ids();
        if let Some(catalog) = &self.catalog {
            if let Some(total) = self.request_total(catalog.as_ref(), &payload).await {
                card.upsert_field("Total Requests", total, true);
            }
            if mentions_requesters(&payload.event) {
                self.add_requesters(catalog.as_ref(), &payload, &mut card, &mut mentions)
                    .await;
            }
        }

        let content = mentions
            .iter()
            .map(|id| format!("<@{}>", id))
            .collect::<Vec<_>>()
            .join(" ");
        match self.sink.post(&channel, content, View::terminal(card)).await {
            Ok(()) => {
                info!(channel = %channel, event = %payload.event, "Notification relayed");
                RelayOutcome::Posted
            }
            Err(e) => {
                warn!(channel = %channel, event = %payload.event, error = %e, "Failed to post notification");
                RelayOutcome::Failed
            }
        }
    }

    /// Count from the payload, else from the catalog for the resolved user
    async fn request_total(&self, catalog: &dyn CatalogClient, payload: &NotificationPayload) -> Option<String> {
        let actor = payload.actor()?;
        if let Some(count) = nonzero(actor.request_count) {
            return Some(count.to_string());
        }

        let mut user = actor.user_id.trim().parse::<u64>().ok().map(UserId);
        let discord_id = actor.discord_id.trim();
        if let Some(identity) = &self.identity
            && !discord_id.is_empty()
        {
            let owner = OwnerKey::new(discord_id);
            match with_deadline(self.lookup_timeout, identity.resolve_external_identity(&owner)).await {
                Ok(Some(linked)) => user = Some(linked),
                Ok(None) => {}
                Err(e) => debug!(discord_id, error = %e, "Identity lookup failed"),
            }
        }

        let user = user?;
        match with_deadline(self.lookup_timeout, catalog.user_request_total(user)).await {
            Ok(total) => Some(total.to_string()),
            Err(e) => {
                debug!(user = %user, error = %e, "Request total lookup failed");
                None
            }
        }
    }

    /// Mention every linked requester of the media and list them all
    async fn add_requesters(
        &self,
        catalog: &dyn CatalogClient,
        payload: &NotificationPayload,
        card: &mut Card,
        mentions: &mut Vec<String>,
    ) {
        let Some(media) = &payload.media else {
            return;
        };
        let Some(kind) = MediaKind::parse(&media.media_type) else {
            return;
        };
        let Ok(id) = media.media_id().parse::<u64>() else {
            return;
        };
        let detail = match with_deadline(self.lookup_timeout, catalog.detail(kind, id)).await {
            Ok(detail) => detail,
            Err(e) => {
                debug!(media_id = id, error = %e, "Detail lookup for mentions failed");
                return;
            }
        };

        for requester in &detail.requesters {
            match with_deadline(self.lookup_timeout, catalog.user(requester.id)).await {
                Ok(user) => {
                    if let Some(external) = user.external_id.as_deref().map(str::trim)
                        && !external.is_empty()
                        && !mentions.iter().any(|m| m == external)
                    {
                        mentions.push(external.to_string());
                    }
                }
                Err(e) => debug!(user = %requester.id, error = %e, "Requester lookup failed"),
            }
        }

        if let Some((first, watchers)) = detail.requester_summary() {
            let mut names = vec![first];
            names.extend(watchers);
            let names = names.join(", ");
            if card.field_value("Requested By").is_some() || payload.request.is_some() {
                card.upsert_field("Requested By", names, true);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use haruki_api::{
        CatalogUser, ExtraInfo, IssueInfo, MediaDetail, MediaInfo, MediaStatus, RequestInfo,
        Requester,
    };
    use haruki_remote_api::{MockCatalog, MockIdentity, MockViewSink};

    fn request_payload() -> NotificationPayload {
        NotificationPayload {
            notification_type: "MEDIA_APPROVED".into(),
            event: "MEDIA_APPROVED".into(),
            subject: "Heat (1995)".into(),
            message: "Approved".into(),
            media: Some(MediaInfo {
                media_type: "movie".into(),
                tmdb_id: "949".into(),
                ..Default::default()
            }),
            request: Some(RequestInfo {
                username: "ann".into(),
                user_id: "4".into(),
                discord_id: "111".into(),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    fn relay_with(
        catalog: Option<Arc<dyn CatalogClient>>,
        identity: Option<Arc<dyn IdentityLinker>>,
        sink: Arc<MockViewSink>,
    ) -> NotificationRelay {
        NotificationRelay::new(
            Duration::from_secs(30),
            Some("default".into()),
            catalog,
            identity,
            sink,
        )
    }

    #[test]
    fn card_for_request_event() {
        let card = notification_card(&request_payload());
        assert_eq!(card.title, "Heat (1995)");
        assert_eq!(card.color, Some(COLOR_GREEN));
        assert_eq!(card.author.as_deref(), Some("✅ Request Approved"));
        assert_eq!(card.field_value("Requested By"), Some("ann"));
        assert_eq!(card.field_value("Request Status"), Some("Approved"));
        assert_eq!(card.field_value("Total Requests"), None);
        assert_eq!(
            card.field_value("Media Info: movie"),
            Some("**TMDB ID:** [949](https://www.themoviedb.org/movie/949)")
        );
    }

    #[test]
    fn unknown_event_keeps_default_color() {
        let payload = NotificationPayload {
            event: "TEST_NOTIFICATION".into(),
            subject: "ping".into(),
            ..Default::default()
        };
        let card = notification_card(&payload);
        assert_eq!(card.color, Some(COLOR_DEFAULT));
        assert!(card.author.is_none());
        assert!(card.fields.is_empty());
    }

    #[test]
    fn issue_and_plex_link() {
        let payload = NotificationPayload {
            event: "Issue Reported".into(),
            issue: Some(IssueInfo {
                email: "bob@example.com".into(),
                ..Default::default()
            }),
            extra: vec![ExtraInfo {
                name: "plex_link".into(),
                value: "https://app.plex.tv/item".into(),
            }],
            ..Default::default()
        };
        let card = notification_card(&payload);
        assert_eq!(card.author.as_deref(), Some("⚠️ Issue Reported"));
        assert_eq!(card.field_value("Reported By"), Some("bob@example.com"));
        assert_eq!(card.footer.as_deref(), Some("Plex: https://app.plex.tv/item"));
        assert_eq!(card.url.as_deref(), Some("https://app.plex.tv/item"));
    }

    #[test]
    fn total_requests_prefers_extras() {
        let mut payload = request_payload();
        payload.request.as_mut().unwrap().request_count = "3".into();
        assert_eq!(notification_card(&payload).field_value("Total Requests"), Some("3"));

        payload.extra.push(ExtraInfo {
            name: "total_requests".into(),
            value: "9".into(),
        });
        assert_eq!(notification_card(&payload).field_value("Total Requests"), Some("9"));
    }

    #[tokio::test(start_paused = true)]
    async fn duplicate_within_window_posts_once() {
        let sink = Arc::new(MockViewSink::new());
        let relay = relay_with(None, None, sink.clone());

        assert_eq!(relay.relay(request_payload()).await, RelayOutcome::Posted);
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(relay.relay(request_payload()).await, RelayOutcome::Suppressed);
        tokio::time::sleep(Duration::from_secs(31)).await;
        assert_eq!(relay.relay(request_payload()).await, RelayOutcome::Posted);
        assert_eq!(sink.posts().len(), 2);
    }

    #[tokio::test]
    async fn payload_channel_wins_over_default() {
        let sink = Arc::new(MockViewSink::new());
        let relay = relay_with(None, None, sink.clone());
        let mut payload = request_payload();
        payload.channel_id = Some("chan-9".into());

        relay.relay(payload).await;
        let posts = sink.posts();
        assert_eq!(posts[0].channel_id, "chan-9");
        assert_eq!(posts[0].content, "<@111>");
    }

    #[tokio::test]
    async fn no_channel_drops() {
        let sink = Arc::new(MockViewSink::new());
        let relay = NotificationRelay::new(Duration::from_secs(30), None, None, None, sink.clone());
        assert_eq!(relay.relay(request_payload()).await, RelayOutcome::NoChannel);
        assert!(sink.posts().is_empty());
    }

    #[tokio::test]
    async fn enrichment_from_catalog() {
        let catalog = Arc::new(
            MockCatalog::new()
                .with_detail(MediaDetail {
                    id: 949,
                    kind: MediaKind::Movie,
                    title: "Heat".into(),
                    year: Some("1995".into()),
                    overview: String::new(),
                    poster_path: None,
                    status: MediaStatus::Processing,
                    requesters: vec![
                        Requester { id: UserId(4), display_name: "ann".into() },
                        Requester { id: UserId(5), display_name: "bob".into() },
                    ],
                })
                .with_user(CatalogUser {
                    id: UserId(5),
                    display_name: "bob".into(),
                    email: String::new(),
                    external_id: Some("222".into()),
                }),
        );
        catalog.set_request_total(UserId(4), 12);
        let sink = Arc::new(MockViewSink::new());
        let relay = relay_with(Some(catalog), None, sink.clone());

        assert_eq!(relay.relay(request_payload()).await, RelayOutcome::Posted);
        let post = &sink.posts()[0];
        assert_eq!(post.content, "<@111> <@222>");
        let card = post.view.first_card().unwrap();
        assert_eq!(card.field_value("Total Requests"), Some("12"));
        assert_eq!(card.field_value("Requested By"), Some("ann, bob"));
    }

    #[tokio::test]
    async fn linked_identity_overrides_payload_user() {
        let catalog = Arc::new(MockCatalog::new());
        catalog.set_request_total(UserId(8), 2);
        let identity = Arc::new(MockIdentity::new().with_link("111", UserId(8)));
        let sink = Arc::new(MockViewSink::new());
        let relay = relay_with(Some(catalog), Some(identity), sink.clone());

        relay.relay(request_payload()).await;
        let card = sink.posts()[0].view.first_card().cloned().unwrap();
        assert_eq!(card.field_value("Total Requests"), Some("2"));
    }

    #[tokio::test(start_paused = true)]
    async fn slow_lookups_do_not_hold_the_post() {
        let catalog = Arc::new(MockCatalog::new());
        catalog.set_request_total(UserId(4), 12);
        catalog.set_lookup_delay(Some(Duration::from_secs(3600)));
        let identity = Arc::new(MockIdentity::new().with_link("111", UserId(4)));
        identity.set_delay(Some(Duration::from_secs(3600)));
        let sink = Arc::new(MockViewSink::new());
        let relay = relay_with(Some(catalog), Some(identity), sink.clone())
            .with_lookup_timeout(Duration::from_secs(5));

        let start = tokio::time::Instant::now();
        assert_eq!(relay.relay(request_payload()).await, RelayOutcome::Posted);
        assert!(start.elapsed() < Duration::from_secs(60));

        let post = &sink.posts()[0];
        assert_eq!(post.content, "<@111>");
        assert_eq!(post.view.first_card().unwrap().field_value("Total Requests"), None);
    }

    #[tokio::test]
    async fn post_failure_is_swallowed() {
        let sink = Arc::new(MockViewSink::new());
        *sink.fail.lock().unwrap() = true;
        let relay = relay_with(None, None, sink);
        assert_eq!(relay.relay(request_payload()).await, RelayOutcome::Failed);
    }
}
