use common::TrackData;

/// The per-file metadata sources, each optional.
#[derive(Clone, Debug, Default)]
pub struct Sources {
    pub filename: Option<TrackData>,
    pub id3v1: Option<TrackData>,
    pub id3v2: Option<TrackData>,
}

impl Sources {
    pub fn reconcile(&self) -> TrackData {
        reconcile(
            self.filename.as_ref(),
            self.id3v1.as_ref(),
            self.id3v2.as_ref(),
        )
    }
}

/// Merges the sources field by field: the frame tag wins over the legacy
/// tag, and either tag wins over the filename. Empty text only wins when no
/// source has anything better.
pub fn reconcile(
    filename: Option<&TrackData>,
    id3v1: Option<&TrackData>,
    id3v2: Option<&TrackData>,
) -> TrackData {
    let ranked: Vec<&TrackData> = [id3v2, id3v1, filename].into_iter().flatten().collect();

    TrackData {
        title: pick_text(&ranked, |data| &data.title),
        artist: pick_text(&ranked, |data| &data.artist),
        album: pick_text(&ranked, |data| &data.album),
        year: pick(&ranked, |data| data.year),
        track: pick(&ranked, |data| data.track),
        genre: pick(&ranked, |data| data.genre),
        comment: pick_text(&ranked, |data| &data.comment),
    }
}

fn pick_text<F>(ranked: &[&TrackData], field: F) -> Option<String>
where
    F: Fn(&TrackData) -> &Option<String>,
{
    let mut fallback = None;
    for data in ranked {
        match field(*data) {
            Some(value) if !value.is_empty() => return Some(value.clone()),
            Some(value) if fallback.is_none() => fallback = Some(value.clone()),
            _ => {}
        }
    }
    fallback
}

fn pick<T, F>(ranked: &[&TrackData], field: F) -> Option<T>
where
    F: Fn(&TrackData) -> Option<T>,
{
    ranked.iter().find_map(|data| field(*data))
}
