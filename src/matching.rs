//! Template loading and frame scoring
//!
//! Templates are loaded once per worker into grayscale form; each frame is
//! scored with normalized cross-correlation and the templates' trigger
//! conditions are applied in list order.

use std::path::Path;

use image::GrayImage;
use imageproc::template_matching::{find_extremes, match_template, MatchTemplateMethod};

use crate::config::{TemplateConfig, TriggerCondition};

/// A template ready for matching: its configuration plus the decoded image
pub struct LoadedTemplate {
    pub config: TemplateConfig,
    pub image: GrayImage,
}

impl LoadedTemplate {
    pub fn name(&self) -> &str {
        &self.config.name
    }
}

/// Best normalized cross-correlation score of `template` over all alignments
/// within `frame`, or `None` when the template exceeds the frame in either
/// dimension (the comparison is only defined when the reference fits).
pub fn match_score(frame: &GrayImage, template: &GrayImage) -> Option<f32> {
    let (fw, fh) = frame.dimensions();
    let (tw, th) = template.dimensions();
    if tw > fw || th > fh {
        return None;
    }

    let scores = match_template(
        frame,
        template,
        MatchTemplateMethod::CrossCorrelationNormalized,
    );
    Some(find_extremes(&scores).max_value)
}

/// The immutable set of templates a worker matches against.
///
/// Built once at worker start from the group's template list; disabled
/// templates and templates whose image is missing or unreadable are left out
/// silently, which is how templates are soft-deleted.
pub struct TemplateSet {
    templates: Vec<LoadedTemplate>,
}

impl TemplateSet {
    /// Load every usable template, preserving list order
    pub fn load(configs: &[TemplateConfig], images_dir: &Path) -> Self {
        let mut templates = Vec::with_capacity(configs.len());

        for config in configs {
            if !config.enabled {
                continue;
            }
            if config.file.is_empty() {
                log::warn!("template '{}' has no image file, skipping", config.name);
                continue;
            }

            let path = images_dir.join(&config.file);
            if !path.exists() {
                log::warn!(
                    "template '{}' image not found ({}), skipping",
                    config.name,
                    path.display()
                );
                continue;
            }

            match image::open(&path) {
                Ok(img) => templates.push(LoadedTemplate {
                    config: config.clone(),
                    image: img.to_luma8(),
                }),
                Err(e) => {
                    log::warn!(
                        "template '{}' image failed to decode ({}): {e}",
                        config.name,
                        path.display()
                    );
                }
            }
        }

        Self { templates }
    }

    /// Build directly from already-decoded images (bypasses the filesystem)
    pub fn from_loaded(templates: Vec<LoadedTemplate>) -> Self {
        Self { templates }
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// First template whose trigger condition holds for this frame.
    ///
    /// Presence-triggered templates are evaluated first in list order;
    /// absence-triggered templates are only considered when no presence
    /// template fired, since absence holds trivially on most frames and
    /// would otherwise shadow every positive match behind it in the list.
    pub fn find_trigger(&self, frame: &GrayImage) -> Option<&LoadedTemplate> {
        let mut absence_candidate: Option<&LoadedTemplate> = None;

        for template in &self.templates {
            let Some(score) = match_score(frame, &template.image) else {
                log::debug!(
                    "template '{}' larger than the captured region, skipped",
                    template.config.name
                );
                continue;
            };

            match template.config.trigger_condition {
                TriggerCondition::Found => {
                    if score >= template.config.threshold {
                        return Some(template);
                    }
                }
                TriggerCondition::NotFound => {
                    if score < template.config.threshold && absence_candidate.is_none() {
                        absence_candidate = Some(template);
                    }
                }
            }
        }

        absence_candidate
    }
}
