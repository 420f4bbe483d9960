use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, Utc};
use std::cmp::Ordering;
use std::fmt::Write;
use watchlog_config::SortOrder;
use watchlog_models::{MediaInfo, NormalizedMovie, NormalizedShow, RatingValue, WatchLog};

const TRAKT_BASE: &str = "https://trakt.tv";
const NO_RATING: &str = "–";

/// A validated date pattern, stored in strftime form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateFormat {
    pattern: String,
}

impl DateFormat {
    /// Accepts strftime (`%Y-%m-%d`) or Moment-style tokens (`YYYY-MM-DD`, `D MMM YYYY`).
    /// Text inside `[...]` is copied literally in the Moment form.
    pub fn parse(format: &str) -> Result<Self, String> {
        if format.trim().is_empty() {
            return Err("date format cannot be empty".to_string());
        }
        let pattern = if format.contains('%') {
            format.to_string()
        } else {
            moment_to_strftime(format)
        };
        if StrftimeItems::new(&pattern).any(|item| matches!(item, Item::Error)) {
            return Err(format!("invalid date format '{}'", format));
        }
        Ok(Self { pattern })
    }

    pub fn format(&self, at: &DateTime<Utc>) -> String {
        at.format(&self.pattern).to_string()
    }
}

impl Default for DateFormat {
    fn default() -> Self {
        Self {
            pattern: "%Y-%m-%d".to_string(),
        }
    }
}

// Longest tokens first so "MMMM" wins over "MM".
const MOMENT_TOKENS: &[(&str, &str)] = &[
    ("YYYY", "%Y"),
    ("MMMM", "%B"),
    ("dddd", "%A"),
    ("MMM", "%b"),
    ("ddd", "%a"),
    ("YY", "%y"),
    ("MM", "%m"),
    ("DD", "%d"),
    ("HH", "%H"),
    ("mm", "%M"),
    ("ss", "%S"),
    ("M", "%-m"),
    ("D", "%-d"),
];

fn moment_to_strftime(format: &str) -> String {
    let mut out = String::with_capacity(format.len() * 2);
    let mut rest = format;
    while !rest.is_empty() {
        if let Some(stripped) = rest.strip_prefix('[') {
            let end = stripped.find(']').unwrap_or(stripped.len());
            out.push_str(&stripped[..end]);
            rest = stripped.get(end + 1..).unwrap_or("");
            continue;
        }
        if let Some((token, replacement)) = MOMENT_TOKENS.iter().find(|(token, _)| rest.starts_with(token)) {
            out.push_str(replacement);
            rest = &rest[token.len()..];
            continue;
        }
        let mut chars = rest.chars();
        if let Some(c) = chars.next() {
            out.push(c);
        }
        rest = chars.as_str();
    }
    out
}

#[derive(Debug, Clone, Default)]
pub struct RenderOptions {
    pub sort_order: SortOrder,
    pub date_format: DateFormat,
}

/// Render the watch log as a Markdown note.
///
/// Output depends only on the inputs; identical inputs give identical bytes.
pub fn render(log: &WatchLog, options: &RenderOptions) -> String {
    let mut out = String::new();
    render_shows(&mut out, &log.shows, options);
    out.push('\n');
    render_movies(&mut out, &log.movies, options);
    out
}

fn render_shows(out: &mut String, shows: &[NormalizedShow], options: &RenderOptions) {
    out.push_str("# Shows\n\n");
    if shows.is_empty() {
        out.push_str("_No shows found._\n");
        return;
    }

    let mut ordered: Vec<&NormalizedShow> = shows.iter().collect();
    if options.sort_order == SortOrder::Alphabetical {
        ordered.sort_by(|a, b| compare_titles(&a.show, &b.show));
    }

    for (position, show) in ordered.into_iter().enumerate() {
        if position > 0 {
            out.push('\n');
        }
        let show_url = page_url("shows", &show.show);
        let _ = writeln!(out, "## {}", link(&display_title(&show.show), show_url.as_deref()));
        let _ = writeln!(out, "![{}]({})", escape_link_text(&show.show.title), show.poster.url());
        let _ = writeln!(out, "Rating: {}", rating_text(show.rating.as_ref()));

        let mut seasons: Vec<_> = show.seasons.iter().collect();
        seasons.sort_by_key(|season| season.number);
        for season in seasons {
            out.push('\n');
            let label = if season.number == 0 {
                "Specials".to_string()
            } else {
                format!("Season {}", season.number)
            };
            match &season.rating {
                Some(rating) => {
                    let _ = writeln!(out, "### {} (Rated: {})", label, rating_text(Some(rating)));
                }
                None => {
                    let _ = writeln!(out, "### {}", label);
                }
            }

            let mut episodes: Vec<_> = season.episodes.iter().collect();
            episodes.sort_by_key(|episode| episode.number);
            for episode in episodes {
                let code = format!("S{:02}E{:02}", season.number, episode.number);
                let episode_url = show_url
                    .as_ref()
                    .map(|url| format!("{}/seasons/{}/episodes/{}", url, season.number, episode.number));
                let _ = writeln!(
                    out,
                    "- {} watched [[{}]] · {} · {}",
                    link(&code, episode_url.as_deref()),
                    options.date_format.format(&episode.watched_at),
                    plays_text(episode.plays),
                    rating_text(episode.rating.as_ref())
                );
            }
        }
    }
}

fn render_movies(out: &mut String, movies: &[NormalizedMovie], options: &RenderOptions) {
    out.push_str("# Movies\n\n");
    if movies.is_empty() {
        out.push_str("_No movies found._\n");
        return;
    }

    let mut ordered: Vec<&NormalizedMovie> = movies.iter().collect();
    match options.sort_order {
        SortOrder::Chronological => ordered.sort_by(|a, b| {
            b.watched_at
                .cmp(&a.watched_at)
                .then_with(|| compare_titles(&a.movie, &b.movie))
        }),
        SortOrder::Alphabetical => ordered.sort_by(|a, b| {
            compare_titles(&a.movie, &b.movie).then_with(|| b.watched_at.cmp(&a.watched_at))
        }),
    }

    out.push_str("| Poster | Title | Watched | Plays | Rating |\n");
    out.push_str("| --- | --- | --- | --- | --- |\n");
    for movie in ordered {
        let url = page_url("movies", &movie.movie);
        let _ = writeln!(
            out,
            "| ![]({}) | {} | [[{}]] | {} | {} |",
            movie.poster.url(),
            escape_table_cell(&link(&display_title(&movie.movie), url.as_deref())),
            options.date_format.format(&movie.watched_at),
            movie.plays,
            rating_text(movie.rating.as_ref())
        );
    }
}

/// Case-insensitive title order, ties broken by trakt id.
fn compare_titles(a: &MediaInfo, b: &MediaInfo) -> Ordering {
    a.title
        .to_lowercase()
        .cmp(&b.title.to_lowercase())
        .then_with(|| a.trakt_id().cmp(&b.trakt_id()))
}

fn page_url(kind: &str, media: &MediaInfo) -> Option<String> {
    media
        .ids
        .url_segment()
        .map(|segment| format!("{}/{}/{}", TRAKT_BASE, kind, segment))
}

fn display_title(media: &MediaInfo) -> String {
    match media.year {
        Some(year) => format!("{} ({})", media.title, year),
        None => media.title.clone(),
    }
}

fn link(text: &str, url: Option<&str>) -> String {
    match url {
        Some(url) => format!("[{}]({})", escape_link_text(text), url),
        None => escape_link_text(text),
    }
}

fn rating_text(rating: Option<&RatingValue>) -> String {
    match rating {
        Some(rating) => format!("{}/10", rating.rating),
        None => NO_RATING.to_string(),
    }
}

fn plays_text(plays: u32) -> String {
    if plays == 1 {
        "1 play".to_string()
    } else {
        format!("{} plays", plays)
    }
}

fn escape_link_text(text: &str) -> String {
    text.replace('[', "\\[").replace(']', "\\]")
}

fn escape_table_cell(text: &str) -> String {
    text.replace('|', "\\|")
}
