use super::{Provider, SpeechDefaults, VoiceSpec};
use crate::domain::markup::{Block, MarkupDocument};

/// A contiguous run of blocks attributed to one speaker, in document
/// order, with its provider already resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct VoiceSegment {
    pub spec: VoiceSpec,
    pub blocks: Vec<Block>,
}

/// Partition a document into per-speaker sub-documents.
///
/// A `Voice` block opens a section; its children are unwrapped into the
/// segment and any following non-voice siblings belong to it until the
/// next `Voice` block or the end of the document. Blocks before the
/// first voice section, or a document with no voice sections at all,
/// form a single default-voice segment. An explicit `provider`
/// attribute beats the configured default.
pub fn segment(doc: &MarkupDocument, defaults: &SpeechDefaults) -> Vec<VoiceSegment> {
    let mut segments: Vec<VoiceSegment> = Vec::new();
    let mut leading: Vec<Block> = Vec::new();
    let mut current: Option<VoiceSegment> = None;
    let mut saw_voice = false;

    for block in &doc.blocks {
        match block {
            Block::Voice {
                name,
                provider,
                children,
            } => {
                saw_voice = true;
                if let Some(open) = current.take() {
                    segments.push(open);
                }
                current = Some(VoiceSegment {
                    spec: VoiceSpec {
                        voice: Some(name.clone()),
                        provider: resolve_provider(provider.as_deref(), defaults),
                    },
                    blocks: children.clone(),
                });
            }
            other => match current.as_mut() {
                Some(open) => open.blocks.push(other.clone()),
                None => leading.push(other.clone()),
            },
        }
    }

    if let Some(open) = current.take() {
        segments.push(open);
    }

    let default_spec = VoiceSpec {
        voice: defaults.voice.clone(),
        provider: defaults.provider,
    };

    if !saw_voice {
        // Always exactly one segment for an unvoiced document.
        return vec![VoiceSegment {
            spec: default_spec,
            blocks: leading,
        }];
    }

    if !leading.is_empty() {
        segments.insert(
            0,
            VoiceSegment {
                spec: default_spec,
                blocks: leading,
            },
        );
    }

    segments
}

fn resolve_provider(attribute: Option<&str>, defaults: &SpeechDefaults) -> Provider {
    match attribute {
        Some(raw) => match raw.parse::<Provider>() {
            Ok(provider) => provider,
            Err(_) => {
                tracing::warn!(
                    provider_attribute = raw,
                    fallback = %defaults.provider,
                    "Unknown provider attribute on voice section, using document default"
                );
                defaults.provider
            }
        },
        None => defaults.provider,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::markup::parse;
    use pretty_assertions::assert_eq;

    fn defaults() -> SpeechDefaults {
        SpeechDefaults {
            voice: Some("default-voice".to_string()),
            provider: Provider::Google,
        }
    }

    #[test]
    fn test_unvoiced_document_yields_one_default_segment() {
        let doc = parse("<speak><p>One.</p><p>Two.</p></speak>").unwrap();
        let segments = segment(&doc, &defaults());
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].spec.voice.as_deref(), Some("default-voice"));
        assert_eq!(segments[0].spec.provider, Provider::Google);
        assert_eq!(segments[0].blocks, doc.blocks);
    }

    #[test]
    fn test_voice_order_is_preserved() {
        let doc = parse(
            "<speak>\
             <voice name=\"alice\"><p>A1.</p></voice>\
             <voice name=\"bob\"><p>B1.</p></voice>\
             <voice name=\"alice\"><p>A2.</p></voice>\
             </speak>",
        )
        .unwrap();
        let segments = segment(&doc, &defaults());
        let names: Vec<_> = segments
            .iter()
            .map(|s| s.spec.voice.clone().unwrap())
            .collect();
        assert_eq!(names, vec!["alice", "bob", "alice"]);
    }

    #[test]
    fn test_blocks_after_voice_section_belong_to_it() {
        let doc = parse(
            "<speak>\
             <voice name=\"alice\"><p>Inside.</p></voice>\
             <p>Trailing.</p>\
             </speak>",
        )
        .unwrap();
        let segments = segment(&doc, &defaults());
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].blocks.len(), 2);
    }

    #[test]
    fn test_leading_unvoiced_blocks_form_extra_segment() {
        let doc = parse(
            "<speak>\
             <p>Intro.</p>\
             <voice name=\"alice\"><p>Story.</p></voice>\
             </speak>",
        )
        .unwrap();
        let segments = segment(&doc, &defaults());
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].spec.voice.as_deref(), Some("default-voice"));
        assert_eq!(segments[1].spec.voice.as_deref(), Some("alice"));
    }

    #[test]
    fn test_no_block_is_assigned_twice() {
        let doc = parse(
            "<speak>\
             <p>Intro.</p>\
             <voice name=\"alice\"><p>A.</p></voice>\
             <break time=\"1s\"/>\
             <voice name=\"bob\"><p>B.</p></voice>\
             </speak>",
        )
        .unwrap();
        let segments = segment(&doc, &defaults());
        let total: usize = segments.iter().map(|s| s.blocks.len()).sum();
        // Intro + A + trailing break + B; the two voice wrappers unwrap.
        assert_eq!(total, 4);
    }

    #[test]
    fn test_explicit_provider_attribute_wins() {
        let doc = parse(
            "<speak><voice name=\"alice\" provider=\"minimax\"><p>Hi.</p></voice></speak>",
        )
        .unwrap();
        let segments = segment(&doc, &defaults());
        assert_eq!(segments[0].spec.provider, Provider::Minimax);
    }

    #[test]
    fn test_unknown_provider_attribute_falls_back_to_default() {
        let doc = parse(
            "<speak><voice name=\"alice\" provider=\"polly\"><p>Hi.</p></voice></speak>",
        )
        .unwrap();
        let segments = segment(&doc, &defaults());
        assert_eq!(segments[0].spec.provider, Provider::Google);
    }
}
