//! Render specification built from a record's generated assets.

use reel_models::{fields, RenderElement, RenderScene, RenderSpec, SegmentKey, WorkRecord};

use crate::error::{WorkerError, WorkerResult};

/// Build a render with one scene per segment that has narration audio.
///
/// Item scenes show the item image and title when the record has them; the
/// intro scene shows the record title. Segments without audio are skipped.
pub fn build_render_spec(record: &WorkRecord) -> WorkerResult<RenderSpec> {
    let title = record.title();

    let scenes: Vec<RenderScene> = SegmentKey::all()
        .into_iter()
        .filter_map(|segment| {
            let audio = record.text(&segment.asset_field())?;
            Some(scene_for(record, segment, title.as_deref(), audio))
        })
        .collect();

    if scenes.is_empty() {
        return Err(WorkerError::missing_input(&record.id, "narration audio"));
    }

    Ok(RenderSpec {
        comment: Some(format!("record {}", record.id)),
        scenes,
        ..RenderSpec::default()
    })
}

fn scene_for(
    record: &WorkRecord,
    segment: SegmentKey,
    title: Option<&str>,
    audio: String,
) -> RenderScene {
    let mut elements = Vec::new();

    match segment {
        SegmentKey::Item(n) => {
            if let Some(src) = record.text(&fields::item_image(n)) {
                elements.push(RenderElement::Image {
                    src,
                    duration: None,
                });
            }
            if let Some(text) = record.text(&fields::item_title(n)) {
                elements.push(RenderElement::Text {
                    text,
                    style: Some("item-title".to_string()),
                });
            }
        }
        SegmentKey::Intro => {
            if let Some(text) = title {
                elements.push(RenderElement::Text {
                    text: text.to_string(),
                    style: Some("headline".to_string()),
                });
            }
        }
        SegmentKey::Outro => {}
    }

    elements.push(RenderElement::Audio { src: audio });

    RenderScene {
        comment: Some(segment.slug()),
        elements,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scenes_follow_audio_fields() {
        let record = WorkRecord::new("rec1")
            .with_field("Title", "Best budget blenders")
            .with_field("Intro Audio", "https://cdn/intro.mp3")
            .with_field("Item 1 Audio", "https://cdn/item1.mp3")
            .with_field("Item 1 Image", "https://img/1.jpg")
            .with_field("Item 1 Title", "Blender One")
            .with_field("Item 2 Title", "Blender Two")
            .with_field("Outro Audio", "https://cdn/outro.mp3");

        let spec = build_render_spec(&record).unwrap();
        assert_eq!(spec.scenes.len(), 3);

        let item = &spec.scenes[1];
        assert_eq!(item.comment.as_deref(), Some("item_1"));
        assert_eq!(item.elements.len(), 3);
        assert!(matches!(&item.elements[0], RenderElement::Image { src, .. } if src == "https://img/1.jpg"));
        assert!(matches!(&item.elements[2], RenderElement::Audio { src } if src == "https://cdn/item1.mp3"));

        let outro = &spec.scenes[2];
        assert_eq!(outro.elements.len(), 1);
    }

    #[test]
    fn test_no_audio_is_missing_input() {
        let record = WorkRecord::new("rec1").with_field("Title", "Nothing yet");
        let err = build_render_spec(&record).unwrap_err();
        assert!(matches!(err, WorkerError::MissingInput { .. }));
    }
}
