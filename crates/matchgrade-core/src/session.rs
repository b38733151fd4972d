//! Interactive grading session with cached statistics.
//!
//! A session holds the current source and reference, caches each image's CDF
//! when it is loaded, and caches the derived channel mappings until either
//! image changes. Previews at different intensities and LUT exports all read
//! the same cached mappings, so export always matches what was previewed.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::{MatchError, Result};
use crate::grading::apply::apply_mappings;
use crate::grading::mapping::ChannelMappings;
use crate::image::PixelBuffer;
use crate::pipeline::ImageStats;
use crate::stats::Cdf;
use crate::transform::lut::LutGrid;
use crate::transform::params::GradeParams;

#[derive(Default)]
struct SessionState {
    source: Option<Arc<PixelBuffer>>,
    source_cdf: Option<Arc<Cdf>>,
    reference_cdf: Option<Arc<Cdf>>,
    mappings: Option<Arc<ChannelMappings>>,
}

/// Thread-safe holder for one source/reference pair.
///
/// All methods take `&self`; share the session behind an `Arc` to serve
/// concurrent preview requests.
#[derive(Default)]
pub struct GradingSession {
    state: RwLock<SessionState>,
}

impl GradingSession {
    /// Create an empty session.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the source image. Fails with `EmptyImage` for zero pixels.
    pub fn set_source(&self, source: PixelBuffer) -> Result<()> {
        let stats = ImageStats::compute(&source)?;
        let mut state = self.state.write();
        state.source = Some(Arc::new(source));
        state.source_cdf = Some(Arc::new(stats.cdf));
        state.mappings = None;
        tracing::debug!("session source replaced");
        Ok(())
    }

    /// Replace the reference image. Only its CDF is retained.
    pub fn set_reference(&self, reference: &PixelBuffer) -> Result<()> {
        let stats = ImageStats::compute(reference)?;
        let mut state = self.state.write();
        state.reference_cdf = Some(Arc::new(stats.cdf));
        state.mappings = None;
        tracing::debug!("session reference replaced");
        Ok(())
    }

    /// Whether both images are loaded.
    pub fn is_ready(&self) -> bool {
        let state = self.state.read();
        state.source.is_some() && state.reference_cdf.is_some()
    }

    /// The current channel mappings, derived on first use after a change.
    pub fn mappings(&self) -> Result<Arc<ChannelMappings>> {
        Ok(self.snapshot()?.1)
    }

    /// The current source and the mappings derived for it, read under one
    /// lock so a concurrent image change cannot split the pair.
    fn snapshot(&self) -> Result<(Arc<PixelBuffer>, Arc<ChannelMappings>)> {
        {
            let state = self.state.read();
            if let (Some(source), Some(mappings)) = (&state.source, &state.mappings) {
                return Ok((Arc::clone(source), Arc::clone(mappings)));
            }
        }

        let mut state = self.state.write();
        let source = state
            .source
            .clone()
            .ok_or(MatchError::MissingImage("source"))?;
        // Another caller may have derived them while we waited for the lock.
        if let Some(mappings) = state.mappings.clone() {
            return Ok((source, mappings));
        }
        let source_cdf = state
            .source_cdf
            .as_ref()
            .ok_or(MatchError::MissingImage("source"))?;
        let reference_cdf = state
            .reference_cdf
            .as_ref()
            .ok_or(MatchError::MissingImage("reference"))?;

        let mappings = Arc::new(ChannelMappings::derive(source_cdf, reference_cdf)?);
        state.mappings = Some(Arc::clone(&mappings));
        tracing::debug!("session mappings derived");
        Ok((source, mappings))
    }

    /// Grade the current source at `intensity`.
    pub fn preview(&self, intensity: f32) -> Result<PixelBuffer> {
        let (source, mappings) = self.snapshot()?;
        apply_mappings(&source, &mappings, intensity)
    }

    /// Sample the current mappings into a LUT grid.
    pub fn lut(&self, params: &GradeParams) -> Result<LutGrid> {
        params.validate()?;
        let mappings = self.mappings()?;
        LutGrid::synthesize(&mappings, params.intensity, params.lut_size)
    }

    /// Export the current mappings as `.cube` text.
    pub fn export_cube(&self, params: &GradeParams) -> Result<String> {
        Ok(self.lut(params)?.to_cube_string(&params.lut_title))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline;

    fn dim() -> PixelBuffer {
        let data = (0..100u32)
            .flat_map(|i| [(i % 60) as u8, (i % 40) as u8, (i % 80) as u8, 255])
            .collect();
        PixelBuffer::new(10, 10, data).unwrap()
    }

    fn bright() -> PixelBuffer {
        let data = (0..100u32)
            .flat_map(|i| {
                [(180 + i % 70) as u8, (150 + i % 90) as u8, (200 + i % 50) as u8, 255]
            })
            .collect();
        PixelBuffer::new(10, 10, data).unwrap()
    }

    #[test]
    fn test_missing_images_are_reported() {
        let session = GradingSession::new();
        assert!(!session.is_ready());
        assert!(matches!(
            session.preview(1.0),
            Err(MatchError::MissingImage("source"))
        ));

        session.set_source(dim()).unwrap();
        assert!(matches!(
            session.export_cube(&GradeParams::default()),
            Err(MatchError::MissingImage("reference"))
        ));
    }

    #[test]
    fn test_session_matches_stateless_pipeline() {
        let session = GradingSession::new();
        session.set_source(dim()).unwrap();
        session.set_reference(&bright()).unwrap();
        assert!(session.is_ready());

        let expected = pipeline::grade(&dim(), &bright(), 0.6).unwrap();
        assert_eq!(session.preview(0.6).unwrap(), expected);

        let params = GradeParams {
            lut_size: 9,
            ..GradeParams::default()
        };
        let cube = pipeline::export_cube(&dim(), &bright(), &params).unwrap();
        assert_eq!(session.export_cube(&params).unwrap(), cube);
    }

    #[test]
    fn test_mappings_are_cached_until_an_image_changes() {
        let session = GradingSession::new();
        session.set_source(dim()).unwrap();
        session.set_reference(&bright()).unwrap();

        let first = session.mappings().unwrap();
        let second = session.mappings().unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        session.set_reference(&dim()).unwrap();
        let third = session.mappings().unwrap();
        assert!(!Arc::ptr_eq(&first, &third));
        for channel in crate::image::Channel::ALL {
            let mapping = third.channel(channel);
            assert!(mapping.is_monotonic());
        }
    }

    #[test]
    fn test_empty_source_is_rejected_and_previous_kept() {
        let session = GradingSession::new();
        session.set_source(dim()).unwrap();
        let empty = PixelBuffer::new(0, 0, Vec::new()).unwrap();
        assert!(matches!(
            session.set_source(empty),
            Err(MatchError::EmptyImage)
        ));
        session.set_reference(&bright()).unwrap();
        assert!(session.preview(1.0).is_ok());
    }

    #[test]
    fn test_preview_pairs_source_with_its_own_mappings() {
        let session = Arc::new(GradingSession::new());
        session.set_source(dim()).unwrap();
        session.set_reference(&bright()).unwrap();
        let from_dim = pipeline::grade(&dim(), &bright(), 1.0).unwrap();
        let from_bright = pipeline::grade(&bright(), &bright(), 1.0).unwrap();

        let writer = {
            let session = Arc::clone(&session);
            std::thread::spawn(move || {
                for i in 0..50 {
                    let source = if i % 2 == 0 { bright() } else { dim() };
                    session.set_source(source).unwrap();
                }
            })
        };
        for _ in 0..50 {
            let graded = session.preview(1.0).unwrap();
            assert!(graded == from_dim || graded == from_bright);
        }
        writer.join().unwrap();
    }

    #[test]
    fn test_concurrent_previews_share_mappings() {
        let session = Arc::new(GradingSession::new());
        session.set_source(dim()).unwrap();
        session.set_reference(&bright()).unwrap();

        let handles: Vec<_> = (0..=4)
            .map(|i| {
                let session = Arc::clone(&session);
                std::thread::spawn(move || session.preview(i as f32 / 4.0).unwrap())
            })
            .collect();
        let results: Vec<PixelBuffer> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert_eq!(results[0].as_bytes(), dim().as_bytes());
        assert_eq!(results[4], pipeline::grade(&dim(), &bright(), 1.0).unwrap());
    }
}
