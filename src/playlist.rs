//! HLS playlist decoding
//!
//! Only what variant selection needs: the playlist kind and, for master
//! playlists, each `#EXT-X-STREAM-INF` variant's bandwidth and URI.

use thiserror::Error;

/// One encoded rendition listed by a master playlist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variant {
    /// Peak bandwidth in bits per second
    pub bandwidth: u64,
    pub uri: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Playlist {
    /// Variants in the order the playlist lists them, possibly none
    Master(Vec<Variant>),
    Media { segments: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlaylistError {
    #[error("missing #EXTM3U header")]
    MissingHeader,
    #[error("cannot detect playlist type")]
    UnknownType,
    #[error("playlist mixes master and media tags")]
    MixedTags,
    #[error("line {line}: variant has no BANDWIDTH")]
    MissingBandwidth { line: usize },
    #[error("line {line}: invalid BANDWIDTH `{value}`")]
    InvalidBandwidth { line: usize, value: String },
    #[error("line {line}: #EXT-X-STREAM-INF is not followed by a URI")]
    MissingUri { line: usize },
}

const STREAM_INF: &str = "#EXT-X-STREAM-INF:";
const MASTER_TAGS: &[&str] = &[
    "#EXT-X-I-FRAME-STREAM-INF",
    "#EXT-X-MEDIA:",
    "#EXT-X-SESSION-DATA",
    "#EXT-X-SESSION-KEY",
];
const MEDIA_TAGS: &[&str] = &[
    "#EXT-X-TARGETDURATION",
    "#EXT-X-MEDIA-SEQUENCE",
    "#EXT-X-PLAYLIST-TYPE",
    "#EXT-X-ENDLIST",
];

/// Decode playlist text.
pub fn decode(text: &str) -> Result<Playlist, PlaylistError> {
    let mut lines = text
        .trim_start_matches('\u{feff}')
        .lines()
        .enumerate()
        .map(|(i, line)| (i + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty());

    match lines.next() {
        Some((_, "#EXTM3U")) => {}
        _ => return Err(PlaylistError::MissingHeader),
    }

    let mut variants = Vec::new();
    let mut pending: Option<(usize, u64)> = None;
    let mut is_master = false;
    let mut is_media = false;
    let mut segments = 0;

    for (line_no, line) in lines {
        if let Some(attrs) = line.strip_prefix(STREAM_INF) {
            if let Some((line, _)) = pending {
                return Err(PlaylistError::MissingUri { line });
            }
            is_master = true;
            pending = Some((line_no, bandwidth(attrs, line_no)?));
        } else if MASTER_TAGS.iter().any(|tag| line.starts_with(tag)) {
            is_master = true;
        } else if line.starts_with("#EXTINF") {
            is_media = true;
            segments += 1;
        } else if MEDIA_TAGS.iter().any(|tag| line.starts_with(tag)) {
            is_media = true;
        } else if line.starts_with('#') {
            // other tags and comments
        } else if let Some((_, bandwidth)) = pending.take() {
            variants.push(Variant {
                bandwidth,
                uri: line.to_string(),
            });
        }
    }

    if let Some((line, _)) = pending {
        return Err(PlaylistError::MissingUri { line });
    }

    match (is_master, is_media) {
        (true, true) => Err(PlaylistError::MixedTags),
        (true, false) => Ok(Playlist::Master(variants)),
        (false, true) => Ok(Playlist::Media { segments }),
        (false, false) => Err(PlaylistError::UnknownType),
    }
}

fn bandwidth(attrs: &str, line: usize) -> Result<u64, PlaylistError> {
    let value = parse_attributes(attrs)
        .into_iter()
        .find(|(key, _)| key.eq_ignore_ascii_case("BANDWIDTH"))
        .map(|(_, value)| value)
        .ok_or(PlaylistError::MissingBandwidth { line })?;

    value
        .parse()
        .map_err(|_| PlaylistError::InvalidBandwidth { line, value })
}

/// Split an attribute list (`A=1,B="x,y"`) into key/value pairs, unquoting values.
fn parse_attributes(s: &str) -> Vec<(String, String)> {
    let mut attrs = Vec::new();
    let mut rest = s.trim();

    while !rest.is_empty() {
        let Some(eq) = rest.find('=') else {
            break;
        };
        let key = rest[..eq].trim().to_string();
        let after = &rest[eq + 1..];

        let (value, remaining) = if let Some(quoted) = after.strip_prefix('"') {
            match quoted.find('"') {
                Some(end) => (&quoted[..end], &quoted[end + 1..]),
                None => (quoted, ""),
            }
        } else {
            match after.find(',') {
                Some(end) => (&after[..end], &after[end..]),
                None => (after, ""),
            }
        };

        attrs.push((key, value.trim().to_string()));
        rest = remaining.trim_start_matches(',').trim_start();
    }

    attrs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_master() {
        let text = "#EXTM3U\n\
            #EXT-X-VERSION:3\n\
            #EXT-X-STREAM-INF:BANDWIDTH=400000,CODECS=\"avc1.42e01e,mp4a.40.2\",RESOLUTION=640x360\n\
            /sample/77/3/ts.sd.m3u8\n\
            \n\
            #EXT-X-STREAM-INF:RESOLUTION=1280x720,BANDWIDTH=900000\n\
            /sample/77/3/ts.hd.m3u8\n";

        assert_eq!(
            decode(text).unwrap(),
            Playlist::Master(vec![
                Variant {
                    bandwidth: 400_000,
                    uri: "/sample/77/3/ts.sd.m3u8".to_string()
                },
                Variant {
                    bandwidth: 900_000,
                    uri: "/sample/77/3/ts.hd.m3u8".to_string()
                },
            ])
        );
    }

    #[test]
    fn test_decode_master_without_variants() {
        let text = "#EXTM3U\n\
            #EXT-X-INDEPENDENT-SEGMENTS\n\
            #EXT-X-MEDIA:TYPE=AUDIO,GROUP-ID=\"aac\",NAME=\"Main\",URI=\"audio.m3u8\"\n";
        assert_eq!(decode(text).unwrap(), Playlist::Master(vec![]));
    }

    #[test]
    fn test_decode_media() {
        let text = "\u{feff}#EXTM3U\r\n\
            #EXT-X-TARGETDURATION:10\r\n\
            #EXTINF:9.009,\r\n\
            seg0.ts\r\n\
            #EXTINF:9.009,\r\n\
            seg1.ts\r\n\
            #EXT-X-ENDLIST\r\n";
        assert_eq!(decode(text).unwrap(), Playlist::Media { segments: 2 });
    }

    #[test]
    fn test_decode_errors() {
        assert_eq!(decode("<html></html>"), Err(PlaylistError::MissingHeader));
        assert_eq!(decode(""), Err(PlaylistError::MissingHeader));
        assert_eq!(decode("#EXTM3U\n#EXT-X-VERSION:3\n"), Err(PlaylistError::UnknownType));
        assert_eq!(
            decode("#EXTM3U\n#EXT-X-STREAM-INF:RESOLUTION=1x1\na.m3u8\n"),
            Err(PlaylistError::MissingBandwidth { line: 2 })
        );
        assert_eq!(
            decode("#EXTM3U\n#EXT-X-STREAM-INF:BANDWIDTH=fast\na.m3u8\n"),
            Err(PlaylistError::InvalidBandwidth {
                line: 2,
                value: "fast".to_string()
            })
        );
        assert_eq!(
            decode("#EXTM3U\n#EXT-X-STREAM-INF:BANDWIDTH=1\n"),
            Err(PlaylistError::MissingUri { line: 2 })
        );
    }

    #[test]
    fn test_parse_attributes_quoted_commas() {
        let attrs = parse_attributes(r#"CODECS="a,b", BANDWIDTH=5,NAME="x""#);
        assert_eq!(
            attrs,
            vec![
                ("CODECS".to_string(), "a,b".to_string()),
                ("BANDWIDTH".to_string(), "5".to_string()),
                ("NAME".to_string(), "x".to_string()),
            ]
        );
    }
}
