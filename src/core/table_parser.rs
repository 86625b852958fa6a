//! Turns one month's release table into [`MonthReleases`].
//!
//! The release tables use three row shapes:
//!
//! * `day | artist | album` opens a new day,
//! * `artist | album` adds a release to the current day,
//! * `album` is another album by the artist of the row right above it.
//!
//! Rows are read in order by a small state machine that carries the current day and
//! the shape and artist of the previous row.

use crate::domain::model::{Day, MonthReleases, Release};
use crate::utils::error::{NotifierError, Result};
use chrono::Month;
use scraper::{ElementRef, Html, Selector};

/// Cell texts of each `<tr>` in a table, header row included.
pub type RawTable = Vec<Vec<String>>;

const HEADER_ARTIST: &str = "Artist";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RowShape {
    Full,
    ArtistAlbum,
    AlbumOnly,
}

#[derive(Debug)]
struct PreviousRow {
    shape: RowShape,
    artist: String,
}

#[derive(Debug, Default)]
struct RowState {
    current_day: Option<Day>,
    previous: Option<PreviousRow>,
}

impl RowState {
    fn remember(&mut self, shape: RowShape, artist: &str) {
        self.previous = Some(PreviousRow {
            shape,
            artist: artist.to_string(),
        });
    }
}

/// Parses the rows of one month's table. Row 0 is the header and is skipped.
///
/// An unparseable day cell aborts the whole table: once the day column is wrong
/// every following row would be filed under the wrong date.
pub fn parse_table(month: Month, rows: &[Vec<String>]) -> Result<MonthReleases> {
    let mut releases = MonthReleases::new();
    let mut state = RowState::default();

    for (index, cells) in rows.iter().enumerate().skip(1) {
        match cells.as_slice() {
            [day, artist, album] => {
                if artist == HEADER_ARTIST {
                    continue;
                }
                let day = parse_day(month, index, day)?;
                state.current_day = Some(day);
                releases
                    .entry(day)
                    .or_default()
                    .push(Release::new(artist.as_str(), trim_album_name(album)));
                state.remember(RowShape::Full, artist);
            }
            [artist, album] => {
                let Some(day) = state.current_day else {
                    tracing::warn!("{}: row {} has no preceding day, skipped", month.name(), index);
                    continue;
                };
                releases
                    .entry(day)
                    .or_default()
                    .push(Release::new(artist.as_str(), trim_album_name(album)));
                state.remember(RowShape::ArtistAlbum, artist);
            }
            [album] => {
                let (Some(day), Some(previous)) = (state.current_day, state.previous.as_ref())
                else {
                    tracing::warn!(
                        "{}: continuation row {} has nothing to continue, skipped",
                        month.name(),
                        index
                    );
                    continue;
                };
                let artist = previous.artist.clone();
                tracing::trace!(
                    "{}: row {} continues a {:?} row by {}",
                    month.name(),
                    index,
                    previous.shape,
                    artist
                );
                releases
                    .entry(day)
                    .or_default()
                    .push(Release::new(artist.as_str(), trim_album_name(album)));
                state.remember(RowShape::AlbumOnly, &artist);
            }
            _ => {}
        }
    }

    Ok(releases)
}

fn parse_day(month: Month, row: usize, text: &str) -> Result<Day> {
    let malformed = || NotifierError::MalformedRowError {
        month: month.name().to_string(),
        row,
        value: text.to_string(),
    };

    let day: Day = text.trim().parse().map_err(|_| malformed())?;
    if !(1..=31).contains(&day) {
        return Err(malformed());
    }
    Ok(day)
}

/// Drops footnote markers such as `[42]` and collapses whitespace.
pub fn trim_album_name(album: &str) -> String {
    match album.find('[') {
        Some(i) => collapse_whitespace(&album[..i]),
        None => collapse_whitespace(album),
    }
}

/// Cells broken over several lines or by `<br>` read as one line.
fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| NotifierError::SelectorError {
        message: format!("{}: {}", css, e),
    })
}

/// Finds the release table for `month`.
///
/// The table right after the heading named for the month wins; the `table_<Month>`
/// identifier is the fallback. `Ok(None)` means the month has no table yet.
pub fn locate_table(doc: &Html, month: Month) -> Result<Option<RawTable>> {
    let name = month.name();

    let anchored = selector(&format!("[id='{}']", name))?;
    if let Some(heading) = doc.select(&anchored).next() {
        if let Some(table) = table_after(heading) {
            return read_rows(table).map(Some);
        }
    }

    let mut ids = vec![format!("#table_{}", name)];
    if month == Month::February {
        ids.push("#table_Febuary".to_string());
    }
    for id in ids {
        if let Some(table) = doc.select(&selector(&id)?).next() {
            return read_rows(table).map(Some);
        }
    }

    Ok(None)
}

/// The heading id sits either on the heading itself or on a span inside it, so the
/// element and then its parent are tried as the anchor.
fn table_after(heading: ElementRef<'_>) -> Option<ElementRef<'_>> {
    let parent = heading.parent().and_then(ElementRef::wrap);

    [Some(heading), parent]
        .into_iter()
        .flatten()
        .find_map(|anchor| {
            anchor
                .next_siblings()
                .find_map(ElementRef::wrap)
                .filter(|next| next.value().name() == "table")
        })
}

fn read_rows(table: ElementRef<'_>) -> Result<RawTable> {
    let tr = selector("tr")?;

    Ok(table
        .select(&tr)
        .map(|row| {
            row.child_elements()
                .filter(|cell| cell.value().name() == "td")
                .map(|cell| collapse_whitespace(&cell.text().collect::<String>()))
                .collect()
        })
        .collect())
}
