use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

/// A parsed setlist: ordered sections, each an ordered list of songs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Setlist {
    pub sets: Vec<SetSection>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SetSection {
    /// Section label as it appeared: "Set I", "Set II", "Encore".
    pub name: String,
    pub songs: Vec<Song>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Song {
    pub title: String,
    /// True when the song segued into the next one (`>` separator in the
    /// payload). Preserved as a display marker distinct from a plain comma.
    pub segue: bool,
    /// Bracketed/parenthetical annotation stripped from the title.
    pub note: Option<String>,
}

// Section markers: "Set I:", "Set 2:", "Encore:", "Encore 2:"
static SECTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?P<name>Set\s+(?:I{1,3}|IV|\d)|Encore(?:\s+\d)?)\s*:").unwrap()
});

// Bracketed or parenthetical annotation inside a song title
static NOTE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[(?P<b>[^\]]*)\]|\((?P<p>[^)]*)\)").unwrap());

/// Parse the raw free-text setlist payload.
///
/// The blob is segmented by the fixed section markers; within a section,
/// `,` separates songs and `>` (or `->`) marks a segued transition.
/// Text before the first marker (or a blob with no markers at all) is
/// ignored rather than guessed at.
pub fn parse_setlist(raw: &str) -> Setlist {
    let raw = raw.replace("->", ">");
    let markers: Vec<_> = SECTION_RE.captures_iter(&raw).collect();
    if markers.is_empty() {
        log::debug!("setlist payload has no section markers");
        return Setlist::default();
    }

    let mut sets = Vec::with_capacity(markers.len());
    for (i, caps) in markers.iter().enumerate() {
        let whole = caps.get(0).unwrap();
        let body_start = whole.end();
        let body_end = markers
            .get(i + 1)
            .map(|next| next.get(0).unwrap().start())
            .unwrap_or(raw.len());

        let songs = parse_songs(&raw[body_start..body_end]);
        if songs.is_empty() {
            continue;
        }
        sets.push(SetSection {
            name: normalize_section_name(caps.name("name").unwrap().as_str()),
            songs,
        });
    }

    Setlist { sets }
}

/// Split one section body into songs, tracking which separator ended each.
fn parse_songs(body: &str) -> Vec<Song> {
    let mut songs = Vec::new();
    let mut current = String::new();

    let push_song = |text: &str, segue: bool, songs: &mut Vec<Song>| {
        let (title, note) = strip_note(text);
        if !title.is_empty() {
            songs.push(Song { title, segue, note });
        }
    };

    for c in body.chars() {
        match c {
            ',' => {
                push_song(&current, false, &mut songs);
                current.clear();
            }
            '>' => {
                push_song(&current, true, &mut songs);
                current.clear();
            }
            _ => current.push(c),
        }
    }
    push_song(&current, false, &mut songs);

    songs
}

/// Remove the first bracketed/parenthetical annotation from a title and
/// return it separately. Remaining annotations are dropped.
fn strip_note(text: &str) -> (String, Option<String>) {
    let note = NOTE_RE.captures(text).map(|caps| {
        caps.name("b")
            .or_else(|| caps.name("p"))
            .unwrap()
            .as_str()
            .trim()
            .to_string()
    });
    let title = NOTE_RE.replace_all(text, "");
    let title = title.split_whitespace().collect::<Vec<_>>().join(" ");
    (title, note.filter(|n| !n.is_empty()))
}

fn normalize_section_name(name: &str) -> String {
    name.split_whitespace().collect::<Vec<_>>().join(" ")
}

impl fmt::Display for Setlist {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, set) in self.sets.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}: ", set.name)?;
            for (j, song) in set.songs.iter().enumerate() {
                if j > 0 {
                    let prev = &set.songs[j - 1];
                    write!(f, "{}", if prev.segue { " > " } else { ", " })?;
                }
                write!(f, "{}", song.title)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_two_sets_with_segues() {
        let raw = "Set I: Mike's Song > Weekapaug Groove, Harry Hood \
                   Set II: Tweezer > Tweezer Reprise";
        let setlist = parse_setlist(raw);
        assert_eq!(setlist.sets.len(), 2);

        let set1 = &setlist.sets[0];
        assert_eq!(set1.name, "Set I");
        assert_eq!(set1.songs.len(), 3);
        assert_eq!(set1.songs[0].title, "Mike's Song");
        assert!(set1.songs[0].segue);
        assert_eq!(set1.songs[1].title, "Weekapaug Groove");
        assert!(!set1.songs[1].segue);
        assert_eq!(set1.songs[2].title, "Harry Hood");

        let set2 = &setlist.sets[1];
        assert_eq!(set2.name, "Set II");
        assert!(set2.songs[0].segue);
    }

    #[test]
    fn test_encore_section() {
        let raw = "Set I: Sample in a Jar Encore: Tweezer Reprise";
        let setlist = parse_setlist(raw);
        assert_eq!(setlist.sets.len(), 2);
        assert_eq!(setlist.sets[1].name, "Encore");
        assert_eq!(setlist.sets[1].songs[0].title, "Tweezer Reprise");
    }

    #[test]
    fn test_numbered_encore() {
        let raw = "Encore: A Day in the Life Encore 2: Tweezer Reprise";
        let setlist = parse_setlist(raw);
        assert_eq!(setlist.sets.len(), 2);
        assert_eq!(setlist.sets[1].name, "Encore 2");
    }

    #[test]
    fn test_arrow_segue_normalized() {
        let raw = "Set I: Scarlet Begonias -> Fire on the Mountain";
        let setlist = parse_setlist(raw);
        let songs = &setlist.sets[0].songs;
        assert_eq!(songs.len(), 2);
        assert_eq!(songs[0].title, "Scarlet Begonias");
        assert!(songs[0].segue);
    }

    #[test]
    fn test_annotation_becomes_note() {
        let raw = "Set I: Harpua [with Tom Marshall narration], Golgi Apparatus";
        let setlist = parse_setlist(raw);
        let songs = &setlist.sets[0].songs;
        assert_eq!(songs[0].title, "Harpua");
        assert_eq!(songs[0].note.as_deref(), Some("with Tom Marshall narration"));
        assert_eq!(songs[1].title, "Golgi Apparatus");
        assert!(songs[1].note.is_none());
    }

    #[test]
    fn test_parenthetical_note() {
        let raw = "Set I: Ghost (unfinished) > Free";
        let setlist = parse_setlist(raw);
        let songs = &setlist.sets[0].songs;
        assert_eq!(songs[0].title, "Ghost");
        assert_eq!(songs[0].note.as_deref(), Some("unfinished"));
        assert!(songs[0].segue);
    }

    #[test]
    fn test_empty_and_markerless_payloads() {
        assert_eq!(parse_setlist(""), Setlist::default());
        assert_eq!(parse_setlist("no markers here"), Setlist::default());
    }

    #[test]
    fn test_display_round_trip_markers() {
        let raw = "Set I: Mike's Song > Weekapaug Groove, Harry Hood";
        let rendered = parse_setlist(raw).to_string();
        assert_eq!(rendered, "Set I: Mike's Song > Weekapaug Groove, Harry Hood");
    }

    #[test]
    fn test_numeric_set_label() {
        let raw = "Set 1: Chalk Dust Torture Set 2: Down with Disease";
        let setlist = parse_setlist(raw);
        assert_eq!(setlist.sets[0].name, "Set 1");
        assert_eq!(setlist.sets[1].name, "Set 2");
    }
}
