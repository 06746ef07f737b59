//! Views produced by the wizards
//!
//! Every function here is pure: it turns wizard state into the [`View`]
//! a bridge applies to the session's message.

use haruki_api::{
    ActionRow, ButtonStyle, Candidate, Card, CatalogUser, ComponentId, Control, Episode,
    MediaDetail, MediaKind, MediaStatus, PlaybackKind, PlaybackSession, Release, SelectOption,
    Title, UserId, UserRequest, View, COLOR_RED, COLOR_YELLOW, MAX_LABEL_LEN, MAX_SELECT_OPTIONS,
};
use haruki_util::{format_minutes, truncate};
use std::time::Duration;

use crate::paging::Page;
use crate::ranking::release_options;

pub const POSTER_BASE_URL: &str = "https://image.tmdb.org/t/p/w500";
pub const MISSING_POSTER_URL: &str = "https://via.placeholder.com/500x750?text=No+Poster";

/// Longest description a card carries
pub const MAX_DESCRIPTION_LEN: usize = 4000;

const COLOR_ALREADY_REQUESTED: u32 = 0x66ccff;
const COLOR_PARTIAL: u32 = 0xff9966;
const COLOR_AVAILABLE: u32 = 0x00cc66;
const COLOR_REQUEST_SENT: u32 = 0x9c5db3;

fn abort_button(id: ComponentId) -> Control {
    Control::button(id, "Abort", ButtonStyle::Danger)
}

fn select_row(id: ComponentId, placeholder: &str, options: Vec<SelectOption>) -> ActionRow {
    ActionRow::new(vec![Control::select(id, placeholder, options)])
}

/// Session expired without further interaction
pub fn timeout_notice(ttl: Duration) -> View {
    View::terminal(
        Card::new(
            "Aborted",
            format!("Session timed out after {} of inactivity.", format_minutes(ttl)),
        )
        .color(COLOR_RED),
    )
}

// --- request wizard ---

pub fn poster_url(detail: &MediaDetail) -> String {
    match &detail.poster_path {
        Some(path) => format!("{}{}", POSTER_BASE_URL, path),
        None => MISSING_POSTER_URL.to_string(),
    }
}

fn candidate_options(candidates: &[Candidate], selected: Option<u64>) -> Vec<SelectOption> {
    candidates
        .iter()
        .take(MAX_SELECT_OPTIONS)
        .map(|c| {
            SelectOption::new(truncate(&c.label(), MAX_LABEL_LEN), c.id.to_string())
                .selected(selected == Some(c.id))
        })
        .collect()
}

fn candidate_select(candidates: &[Candidate], selected: Option<u64>) -> ActionRow {
    select_row(
        ComponentId::RequestSelect,
        "Choose a result…",
        candidate_options(candidates, selected),
    )
}

pub fn request_results(query: &str, candidates: &[Candidate]) -> View {
    View::screen(
        Card::new(
            "🔎 Catalog Search",
            format!("Results for: **{}**\nSelect an item below.", query),
        ),
        vec![
            candidate_select(candidates, None),
            ActionRow::new(vec![abort_button(ComponentId::RequestAbort)]),
        ],
    )
}

pub fn request_detail(detail: &MediaDetail, candidates: &[Candidate]) -> View {
    let card = Card::new(detail.label(), truncate(&detail.overview, MAX_DESCRIPTION_LEN))
        .thumbnail(poster_url(detail));
    View::screen(
        card,
        vec![
            candidate_select(candidates, Some(detail.id)),
            ActionRow::new(vec![
                Control::button(ComponentId::RequestConfirm, "Request", ButtonStyle::Success),
                abort_button(ComponentId::RequestAbort),
            ]),
        ],
    )
}

fn notify_row() -> ActionRow {
    ActionRow::new(vec![
        Control::button(ComponentId::RequestNotify, "Notify Me", ButtonStyle::Primary),
        abort_button(ComponentId::RequestAbort),
    ])
}

fn with_requesters(mut card: Card, detail: &MediaDetail) -> Card {
    if let Some((first, watchers)) = detail.requester_summary() {
        card = card.field("Requested by", first, true);
        if !watchers.is_empty() {
            card = card.field("Will be notified", watchers.join("\n"), true);
        }
    }
    card
}

pub fn already_requested(detail: &MediaDetail) -> View {
    let card = Card::new(detail.title.clone(), detail.overview.clone())
        .color(COLOR_ALREADY_REQUESTED)
        .thumbnail(poster_url(detail))
        .author("🔄 Already Requested");
    View::screen(with_requesters(card, detail), vec![notify_row()])
}

pub fn partial_availability(detail: &MediaDetail) -> View {
    let card = Card::new(
        format!("⚠️ Partial Availability: {}", detail.label()),
        truncate(&detail.overview, MAX_DESCRIPTION_LEN),
    )
    .color(COLOR_PARTIAL)
    .thumbnail(poster_url(detail));
    View::screen(with_requesters(card, detail), vec![notify_row()])
}

pub fn already_available(detail: &MediaDetail) -> View {
    View::terminal(
        Card::new(
            "✅ Media Already Available",
            truncate(&detail.overview, MAX_DESCRIPTION_LEN),
        )
        .color(COLOR_AVAILABLE)
        .thumbnail(poster_url(detail)),
    )
}

pub fn already_requester() -> View {
    View::terminal(Card::new("ℹ️ Already Requested", "You've already requested this media."))
}

pub fn request_sent(detail: &MediaDetail, requester: &str, total_requests: u32) -> View {
    View::terminal(
        Card::new(detail.label(), truncate(&detail.overview, MAX_DESCRIPTION_LEN))
            .color(COLOR_REQUEST_SENT)
            .thumbnail(poster_url(detail))
            .author(format!("{} Request Sent", detail.kind.display_name()))
            .field("Requested By", requester, true)
            .field("Request Status", "Processing", true)
            .field("Total Requests", total_requests.to_string(), true),
    )
}

pub fn request_aborted() -> View {
    View::terminal(Card::new("Aborted", "Request session aborted."))
}

pub fn notify_not_linked() -> View {
    View::terminal(Card::new("Not linked", "Your ID is not linked in the catalog."))
}

pub fn notify_already_watching() -> View {
    View::terminal(Card::new(
        "ℹ️ Already Requested",
        "You'll be notified (already on the watcher list).",
    ))
}

pub fn notify_requested() -> View {
    View::terminal(Card::new(
        "🔔 Notification Requested",
        "You'll be notified when this item becomes available.",
    ))
}

// --- remediation wizard ---

fn nav_row(page: &Page, prev: ComponentId, next: ComponentId, abort: ComponentId) -> ActionRow {
    let mut controls = Vec::new();
    if page.has_prev() {
        controls.push(Control::button(prev, "Prev", ButtonStyle::Secondary));
    }
    if page.has_next() {
        controls.push(Control::button(next, "Next", ButtonStyle::Secondary));
    }
    controls.push(abort_button(abort));
    ActionRow::new(controls)
}

fn remedy_nav(page: &Page, prev: ComponentId, next: ComponentId) -> ActionRow {
    nav_row(page, prev, next, ComponentId::RemedyAbort)
}

pub fn media_page(results: &[Title], page: &Page) -> View {
    let options = page
        .slice(results)
        .iter()
        .map(|t| SelectOption::new(truncate(&t.title, MAX_LABEL_LEN), t.id.to_string()))
        .collect();
    View::screen(
        Card::new("Select Media", page.label()),
        vec![
            select_row(ComponentId::RemedySelectMedia, "Select Media", options),
            remedy_nav(page, ComponentId::RemedyMediaPrev, ComponentId::RemedyMediaNext),
        ],
    )
}

pub fn season_picker(seasons: &[u32]) -> View {
    let mut options: Vec<SelectOption> = seasons
        .iter()
        .take(MAX_SELECT_OPTIONS)
        .map(|s| SelectOption::new(format!("Season {}", s), s.to_string()))
        .collect();
    if options.is_empty() {
        options.push(SelectOption::new("No episodes found", "0"));
    }
    View::screen(
        Card::new("Select Season", "Select season to inspect"),
        vec![
            select_row(ComponentId::RemedySelectSeason, "Select Season", options),
            ActionRow::new(vec![abort_button(ComponentId::RemedyAbort)]),
        ],
    )
}

pub fn episode_page(episodes: &[Episode], page: &Page) -> View {
    let options = page
        .slice(episodes)
        .iter()
        .map(|ep| {
            let mark = if ep.has_file { "✅" } else { "❓" };
            SelectOption::new(
                truncate(&format!("{} {}", mark, ep.code()), MAX_LABEL_LEN),
                ep.id.to_string(),
            )
        })
        .collect();
    View::screen(
        Card::new("Select Episode", page.label()),
        vec![
            select_row(ComponentId::RemedySelectEpisode, "Select Episode", options),
            remedy_nav(page, ComponentId::RemedyEpisodePrev, ComponentId::RemedyEpisodeNext),
        ],
    )
}

/// Placeholder shown while a release lookup is running
pub fn searching() -> View {
    View::terminal(Card::new("Searching...", "Fetching releases, please wait...").color(COLOR_YELLOW))
}

fn release_select(releases: &[Release], selected: Option<&str>) -> ActionRow {
    select_row(
        ComponentId::RemedySelectRelease,
        "Select Release",
        release_options(releases, selected),
    )
}

pub fn release_list(releases: &[Release], page: &Page, is_movie: bool) -> View {
    let title = if is_movie { "Select Movie Release" } else { "Select Release" };
    let description = if page.count > 1 {
        format!("Choose a release to download\n{}", page.label())
    } else {
        "Choose a release to download".to_string()
    };
    View::screen(
        Card::new(title, description),
        vec![
            release_select(page.slice(releases), None),
            remedy_nav(page, ComponentId::RemedyReleasePrev, ComponentId::RemedyReleaseNext),
        ],
    )
}

pub fn release_info_card(release: &Release) -> Card {
    let mut card = Card::new("Release Info", release.display_title());
    if let Some(quality) = &release.quality {
        card = card.field("Quality", quality.clone(), true);
    }
    if let Some(gb) = release.size_gb() {
        card = card.field("Size", format!("{:.2} GB", gb), true);
    }
    if !release.indexer.is_empty() {
        card = card.field("Indexer", release.indexer.clone(), true);
    }
    if !release.languages.is_empty() {
        card = card.field("Languages", release.languages.join(", "), true);
    }
    if let Some(score) = release.custom_format_score {
        card = card.field("Score", format!("{:.0}", score), true);
    }
    if !release.rejections.is_empty() {
        card = card.field("Rejections", release.rejections.join("\n"), false);
    }
    card
}

/// `releases` is the page the release was picked from
pub fn release_info(release: &Release, releases: &[Release]) -> View {
    View::screen(
        release_info_card(release),
        vec![
            release_select(releases, Some(&release.guid)),
            ActionRow::new(vec![
                Control::button(ComponentId::RemedyApprove, "Approve", ButtonStyle::Success),
                Control::button(ComponentId::RemedyChangeRelease, "Change", ButtonStyle::Primary),
                abort_button(ComponentId::RemedyAbort),
            ]),
        ],
    )
}

pub fn no_results(description: impl Into<String>) -> View {
    View::terminal(Card::new("No results", description).color(COLOR_RED))
}

pub fn download_started(title: &str) -> View {
    View::terminal(Card::new("Download Started", format!("Downloading: {}", title)))
}

pub fn remediation_aborted() -> View {
    View::closing_notice("Aborted.")
}

// --- request list ---

const COLOR_REQUEST_LIST: u32 = 0x00adff;

const REQUEST_LEGEND: &str = "**Legend**\n\
    ✅ = Available, ❔ = Unknown, ⌛ = Pending, 🔄 = Processing, ⚠️ = Partial, ❌ = Deleted\n\n\
    Media that is 🔄 Processing usually needs a manual download, try the remediation wizard.\n\
    Media that is ⚠️ Partial usually has missing episodes (running shows included).\n\n\
    **Status — Title — Requested**\n";

fn status_emoji(status: MediaStatus) -> &'static str {
    match status {
        MediaStatus::Unknown => "❔",
        MediaStatus::Pending => "⌛",
        MediaStatus::Processing => "🔄",
        MediaStatus::PartiallyAvailable => "⚠️",
        MediaStatus::Available => "✅",
        MediaStatus::Deleted => "❌",
        MediaStatus::NotTracked => "➖",
    }
}

fn request_line(request: &UserRequest) -> String {
    let kind = match request.kind {
        Some(MediaKind::Movie) => "[Movie] ",
        Some(MediaKind::Tv) => "[TV] ",
        None => "",
    };
    let created = request
        .created_at
        .map(|t| t.format("%d.%m.%y").to_string())
        .unwrap_or_else(|| "—".to_string());
    format!(
        "{} — {}**{}** — {}\n",
        status_emoji(request.media_status),
        kind,
        request.label(),
        created
    )
}

/// One page of a user's requests. Lines that would overflow the card are dropped.
pub fn request_list_page(name: &str, requests: &[UserRequest], page: &Page) -> View {
    let mut description = REQUEST_LEGEND.to_string();
    let shown = page.slice(requests);
    if shown.is_empty() {
        description.push_str("\nNo requests found.");
    }
    for request in shown {
        let line = request_line(request);
        if description.chars().count() + line.chars().count() > MAX_DESCRIPTION_LEN {
            break;
        }
        description.push_str(&line);
    }

    let card = Card::new(format!("Requests for {}", name), description)
        .color(COLOR_REQUEST_LIST)
        .footer(format!("{} (Total: {})", page.label(), requests.len()));
    View::screen(
        card,
        vec![nav_row(
            page,
            ComponentId::RequestListPrev,
            ComponentId::RequestListNext,
            ComponentId::RequestListAbort,
        )],
    )
}

pub fn request_list_aborted() -> View {
    View::closing_notice("Request list aborted.")
}

// --- catalog link ---

const COLOR_LINKED: u32 = 0x00cc66;

/// Pick the catalog user `target` should be linked to
pub fn link_page(target: &str, users: &[CatalogUser], page: &Page, privileged: bool) -> View {
    let shown = page.slice(users);
    let description = format!(
        "Assign ID `{}` to a catalog user.\n\nShowing {}–{} of {} ({}).",
        target,
        page.start + 1,
        page.end,
        users.len(),
        page.label()
    );
    let options = shown
        .iter()
        .map(|u| {
            let option = SelectOption::new(truncate(&u.label(), MAX_LABEL_LEN), u.id.to_string());
            if privileged && u.is_linked() {
                option.describe("Already linked")
            } else if !u.email.is_empty() {
                option.describe(truncate(&u.email, MAX_LABEL_LEN))
            } else {
                option
            }
        })
        .collect();
    View::screen(
        Card::new("Catalog user link", description),
        vec![
            select_row(ComponentId::LinkSelect, "Choose a catalog user…", options),
            nav_row(page, ComponentId::LinkPrev, ComponentId::LinkNext, ComponentId::LinkAbort),
        ],
    )
}

pub fn linked(target: &str, user: UserId) -> View {
    View::terminal(
        Card::new(
            "Linked ✅",
            format!(
                "Assigned ID `{}` to catalog user ID `{}`.\n\nIf this is wrong, run the link command again to reassign.",
                target, user
            ),
        )
        .color(COLOR_LINKED),
    )
}

pub fn link_failed(error: &str) -> View {
    View::terminal(
        Card::new("Link failed", format!("The catalog returned an error: {}", error)).color(COLOR_RED),
    )
}

pub fn link_aborted() -> View {
    View::terminal(Card::new("Aborted", "Link session aborted."))
}

// --- activity ---

const COLOR_MUSIC: u32 = 0x3498db;
const COLOR_TV: u32 = 0x2ecc71;
const COLOR_MOVIE: u32 = 0xe74c3c;
const COLOR_OTHER: u32 = 0x95a5a6;

fn or_dash(value: &str) -> String {
    if value.trim().is_empty() {
        "—".to_string()
    } else {
        value.to_string()
    }
}

pub fn playback_card(session: &PlaybackSession) -> Card {
    let (title, subtitle) = session.headline();
    let mut card = Card::new(title, subtitle)
        .field("User", or_dash(&session.user), true)
        .field("Quality", session.quality_label(), true);

    card = match session.kind() {
        PlaybackKind::Music => card
            .color(COLOR_MUSIC)
            .field("Artist", or_dash(&session.grandparent_title), false)
            .field("Album", or_dash(&session.parent_title), false)
            .field("Song", or_dash(&session.title), false),
        PlaybackKind::Episode => card
            .color(COLOR_TV)
            .field("Show", or_dash(&session.grandparent_title), false)
            .field("Season", or_dash(&session.parent_title), false)
            .field("Episode", or_dash(&session.title), false),
        kind => {
            let (label, color) = if kind == PlaybackKind::Movie {
                ("Movie", COLOR_MOVIE)
            } else {
                ("Title", COLOR_OTHER)
            };
            let title = if session.title.trim().is_empty() {
                &session.full_title
            } else {
                &session.title
            };
            card.color(color).field(label, or_dash(title), false)
        }
    };

    let device = session.device_line();
    if !device.is_empty() {
        card = card.footer(device);
    }
    if let Some(url) = &session.thumbnail {
        card = card.thumbnail(url.clone());
    }
    card
}

/// One card per stream
pub fn activity(sessions: &[PlaybackSession]) -> View {
    View::stack(sessions.iter().map(playback_card).collect())
}
