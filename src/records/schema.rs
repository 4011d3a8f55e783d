//! Volume layout detection.
//!
//! Volume records carry no version tag, so the layout is inferred: both
//! layouts are tried from the same starting offset and the one that decodes
//! wins. A verdict is cached on the detector and reused for the rest of the
//! pool. When both layouts decode, the candidate whose name looks more like
//! a real volume name is returned and the verdict stays unset.

use super::cursor::RecordCursor;
use super::volume::{VolumeLayout, VolumeRecord};
use crate::error::{Error, Result};

/// Per-pool volume layout detection state.
#[derive(Debug, Clone, Default)]
pub struct SchemaDetector {
    verdict: Option<VolumeLayout>,
}

impl SchemaDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with a known layout, e.g. when the pool generation is known.
    pub fn with_layout(layout: VolumeLayout) -> Self {
        Self {
            verdict: Some(layout),
        }
    }

    /// The cached layout verdict, if one has been adopted.
    pub fn cached(&self) -> Option<VolumeLayout> {
        self.verdict
    }

    pub fn reset(&mut self) {
        self.verdict = None;
    }

    /// Decode one volume record, advancing the cursor past it.
    ///
    /// On failure the cursor is left where it was.
    pub fn decode_volume(&mut self, cursor: &mut RecordCursor<'_>) -> Result<VolumeRecord> {
        if let Some(layout) = self.verdict {
            let mut attempt = *cursor;
            match VolumeRecord::decode(&mut attempt, layout) {
                Ok(volume) => {
                    *cursor = attempt;
                    return Ok(volume);
                }
                Err(e) => {
                    tracing::warn!(%layout, error = %e, "cached volume layout failed, re-detecting");
                    self.verdict = None;
                }
            }
        }

        let mut legacy_cursor = *cursor;
        let mut current_cursor = *cursor;
        let legacy = VolumeRecord::decode(&mut legacy_cursor, VolumeLayout::Legacy);
        let current = VolumeRecord::decode(&mut current_cursor, VolumeLayout::Current);

        match (legacy, current) {
            (Ok(volume), Err(_)) => {
                tracing::info!("adopting legacy volume layout");
                self.verdict = Some(VolumeLayout::Legacy);
                *cursor = legacy_cursor;
                Ok(volume)
            }
            (Err(_), Ok(volume)) => {
                tracing::info!("adopting current volume layout");
                self.verdict = Some(VolumeLayout::Current);
                *cursor = current_cursor;
                Ok(volume)
            }
            (Ok(legacy), Ok(current)) => {
                let layout = pick_by_name(&legacy.name, &current.name);
                tracing::warn!(
                    legacy_name = %legacy.name,
                    current_name = %current.name,
                    chosen = %layout,
                    "volume record decodes under both layouts"
                );
                match layout {
                    VolumeLayout::Legacy => {
                        *cursor = legacy_cursor;
                        Ok(legacy)
                    }
                    VolumeLayout::Current => {
                        *cursor = current_cursor;
                        Ok(current)
                    }
                }
            }
            (Err(legacy_err), Err(current_err)) => {
                tracing::debug!(%legacy_err, %current_err, "volume record rejected by both layouts");
                Err(Error::UnrecognizedVolumeLayout)
            }
        }
    }
}

/// Characters common in volume names: `[A-Za-z0-9_.]`.
fn name_score(name: &str) -> usize {
    name.chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '.')
        .count()
}

/// Ties go to the current layout.
fn pick_by_name(legacy_name: &str, current_name: &str) -> VolumeLayout {
    if name_score(legacy_name) > name_score(current_name) {
        VolumeLayout::Legacy
    } else {
        VolumeLayout::Current
    }
}
