//! Heuristic metadata extraction from EU4 save files.
//!
//! Save files mix compressed binary sections with plain `key=value` text.
//! Only two keys matter here, so the file is scanned line by line instead of
//! being parsed:
//!
//! - `player="SWE"` → the player's country tag (`---` means no player)
//! - `date=1523.4.12` → the in-game year (first dot-separated component)
//!
//! Extraction never fails. Unreadable files and malformed values simply leave
//! the corresponding field empty.

use camino::Utf8Path;
use std::fs::{self, File};
use std::io::{BufRead, BufReader};

const PLAYER_KEY: &str = "player=";
const DATE_KEY: &str = "date=";

/// Value the game writes for `player` when nobody is playing.
pub const NO_PLAYER: &str = "---";

/// Tag used in backup names when the save has no player tag.
pub const UNKNOWN_TAG: &str = "UNKNOWN";

/// The two fields the backup engine needs from a save.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SaveMetadata {
    pub player_tag: Option<String>,
    pub in_game_year: Option<i32>,
}

impl SaveMetadata {
    /// Player tag, or [`UNKNOWN_TAG`] when the save has none.
    pub fn tag_or_unknown(&self) -> &str {
        self.player_tag.as_deref().unwrap_or(UNKNOWN_TAG)
    }
}

/// Reads `player` and `date` out of save files.
///
/// Two read strategies are tried. The primary pass reads the whole file and
/// decodes it as UTF-8 with invalid sequences dropped, matching keys on trimmed
/// lines. If a key's line was not found, a line-oriented pass over the file is
/// made for that key. The first matching line for each key decides its value.
#[derive(Debug, Clone, Copy, Default)]
pub struct MetadataExtractor;

impl MetadataExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Extract player tag and in-game year from the file at `path`.
    pub fn extract(&self, path: &Utf8Path) -> SaveMetadata {
        let mut scan = LineScan::default();

        match fs::read(path) {
            Ok(bytes) => {
                let text = decode_dropping_invalid(&bytes);
                for line in text.split('\n') {
                    scan.feed(line.trim());
                    if scan.is_complete() {
                        break;
                    }
                }
            }
            Err(e) => {
                tracing::debug!("Could not read {} for metadata: {}", path, e);
            }
        }

        if !scan.is_complete() {
            self.scan_lines(path, &mut scan);
        }

        scan.into_metadata()
    }

    fn scan_lines(&self, path: &Utf8Path, scan: &mut LineScan) {
        let file = match File::open(path) {
            Ok(file) => file,
            Err(e) => {
                tracing::debug!("Could not open {} for line scan: {}", path, e);
                return;
            }
        };

        for line in BufReader::new(file).split(b'\n') {
            let Ok(line) = line else {
                break;
            };
            scan.feed(&decode_dropping_invalid(&line));
            if scan.is_complete() {
                break;
            }
        }
    }
}

/// Outer `Option` records whether the key's line was seen at all.
#[derive(Debug, Default)]
struct LineScan {
    player: Option<Option<String>>,
    year: Option<Option<i32>>,
}

impl LineScan {
    fn feed(&mut self, line: &str) {
        if self.player.is_none() {
            if let Some(rest) = line.strip_prefix(PLAYER_KEY) {
                self.player = Some(parse_player(rest));
            }
        }
        if self.year.is_none() {
            if let Some(rest) = line.strip_prefix(DATE_KEY) {
                self.year = Some(parse_year(rest));
            }
        }
    }

    fn is_complete(&self) -> bool {
        self.player.is_some() && self.year.is_some()
    }

    fn into_metadata(self) -> SaveMetadata {
        SaveMetadata {
            player_tag: self.player.flatten(),
            in_game_year: self.year.flatten(),
        }
    }
}

fn clean_value(raw: &str) -> &str {
    raw.trim().trim_matches('"')
}

fn parse_player(raw: &str) -> Option<String> {
    let tag = clean_value(raw);
    if tag.is_empty() || tag == NO_PLAYER {
        None
    } else {
        Some(tag.to_string())
    }
}

fn parse_year(raw: &str) -> Option<i32> {
    clean_value(raw).split('.').next()?.trim().parse().ok()
}

fn decode_dropping_invalid(bytes: &[u8]) -> String {
    let mut text = String::with_capacity(bytes.len());
    for chunk in bytes.utf8_chunks() {
        text.push_str(chunk.valid());
    }
    text
}
