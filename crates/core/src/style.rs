use ndarray::Array3;
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, RwLock};

use crate::error::SupertonicError;

/// The closed set of voice identities this engine ships styles for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VoiceId {
    F1,
    F2,
    M1,
    M2,
}

impl VoiceId {
    pub const ALL: [VoiceId; 4] = [VoiceId::F1, VoiceId::F2, VoiceId::M1, VoiceId::M2];

    /// Filename (without directory) of this voice's style asset, e.g. `F1.json`.
    pub fn asset_filename(&self) -> &'static str {
        match self {
            VoiceId::F1 => "F1.json",
            VoiceId::F2 => "F2.json",
            VoiceId::M1 => "M1.json",
            VoiceId::M2 => "M2.json",
        }
    }
}

impl fmt::Display for VoiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            VoiceId::F1 => "F1",
            VoiceId::F2 => "F2",
            VoiceId::M1 => "M1",
            VoiceId::M2 => "M2",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for VoiceId {
    type Err = SupertonicError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "F1" => Ok(VoiceId::F1),
            "F2" => Ok(VoiceId::F2),
            "M1" => Ok(VoiceId::M1),
            "M2" => Ok(VoiceId::M2),
            other => Err(SupertonicError::Validation(format!(
                "unknown voice style identifier: {other}"
            ))),
        }
    }
}

// ============================================================================
// Voice Style Data Structure
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoiceStyleData {
    pub style_ttl: StyleComponent,
    pub style_dp: StyleComponent,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StyleComponent {
    pub data: Vec<Vec<Vec<f32>>>,
    pub dims: Vec<usize>,
    #[serde(rename = "type")]
    pub dtype: String,
}

pub struct Style {
    pub ttl: Array3<f32>,
    pub dp: Array3<f32>,
}

fn flatten_component(component: &StyleComponent) -> Result<Array3<f32>, SupertonicError> {
    if component.dims.len() != 3 {
        return Err(SupertonicError::ShapeMismatch {
            expected: vec![1, 0, 0],
            got: component.dims.clone(),
        });
    }
    let (d0, d1, d2) = (component.dims[0], component.dims[1], component.dims[2]);
    let mut flat = Vec::with_capacity(d0 * d1 * d2);
    for batch in &component.data {
        for row in batch {
            flat.extend_from_slice(row);
        }
    }
    Array3::from_shape_vec((d0, d1, d2), flat).map_err(|_| SupertonicError::ShapeMismatch {
        expected: vec![d0, d1, d2],
        got: vec![],
    })
}

/// Parse one voice style's worth of JSON bytes into a [`Style`], enforcing
/// the single-speaker invariant (`style_ttl.dims[0] == 1`) before returning.
pub fn parse_voice_style(bytes: &[u8]) -> Result<Style, SupertonicError> {
    let data: VoiceStyleData = serde_json::from_slice(bytes)?;

    if data.style_ttl.dims.first().copied() != Some(1) {
        return Err(SupertonicError::ShapeMismatch {
            expected: vec![1],
            got: data.style_ttl.dims.get(..1).map(|s| s.to_vec()).unwrap_or_default(),
        });
    }

    Ok(Style {
        ttl: flatten_component(&data.style_ttl)?,
        dp: flatten_component(&data.style_dp)?,
    })
}

/// Load and concatenate several voice styles into one batch, matching the
/// teacher's multi-path `load_voice_style`/`load_voice_style_from_bytes`
/// used by the `batch` entry point (§4.6a).
pub fn load_voice_style_from_bytes(bytes_list: &[&[u8]]) -> Result<Style, SupertonicError> {
    let bsz = bytes_list.len();
    if bsz == 0 {
        return Err(SupertonicError::Validation(
            "No voice style bytes provided".to_string(),
        ));
    }

    let first_data: VoiceStyleData = serde_json::from_slice(bytes_list[0])?;
    let ttl_dims = &first_data.style_ttl.dims;
    let dp_dims = &first_data.style_dp.dims;
    let (ttl_dim1, ttl_dim2) = (ttl_dims[1], ttl_dims[2]);
    let (dp_dim1, dp_dim2) = (dp_dims[1], dp_dims[2]);

    let mut ttl_flat = vec![0.0f32; bsz * ttl_dim1 * ttl_dim2];
    let mut dp_flat = vec![0.0f32; bsz * dp_dim1 * dp_dim2];

    for (i, bytes) in bytes_list.iter().enumerate() {
        let data: VoiceStyleData = serde_json::from_slice(bytes)?;

        let ttl_offset = i * ttl_dim1 * ttl_dim2;
        let mut idx = 0;
        for batch in &data.style_ttl.data {
            for row in batch {
                for &val in row {
                    ttl_flat[ttl_offset + idx] = val;
                    idx += 1;
                }
            }
        }

        let dp_offset = i * dp_dim1 * dp_dim2;
        idx = 0;
        for batch in &data.style_dp.data {
            for row in batch {
                for &val in row {
                    dp_flat[dp_offset + idx] = val;
                    idx += 1;
                }
            }
        }
    }

    let ttl_style = Array3::from_shape_vec((bsz, ttl_dim1, ttl_dim2), ttl_flat).map_err(|_| {
        SupertonicError::ShapeMismatch {
            expected: vec![bsz, ttl_dim1, ttl_dim2],
            got: vec![],
        }
    })?;
    let dp_style = Array3::from_shape_vec((bsz, dp_dim1, dp_dim2), dp_flat).map_err(|_| {
        SupertonicError::ShapeMismatch {
            expected: vec![bsz, dp_dim1, dp_dim2],
            got: vec![],
        }
    })?;

    Ok(Style {
        ttl: ttl_style,
        dp: dp_style,
    })
}

pub fn load_voice_style(voice_style_paths: &[String]) -> Result<Style, SupertonicError> {
    let mut file_contents = Vec::new();
    for path in voice_style_paths {
        file_contents.push(std::fs::read(path)?);
    }
    let byte_slices: Vec<&[u8]> = file_contents.iter().map(|c| c.as_slice()).collect();
    load_voice_style_from_bytes(&byte_slices)
}

// ============================================================================
// Process-wide, append-only voice style cache
// ============================================================================

/// Caches parsed [`Style`]s by [`VoiceId`], process-wide. Entries are never
/// invalidated (§4.3): once a voice is loaded, it is retained for the
/// process lifetime. Concurrent first-use of the same identifier is safe —
/// both callers parse the same bytes and agree on the result, so whichever
/// insert wins leaves an equal value behind.
pub struct StyleStore {
    asset_root: std::path::PathBuf,
    cache: RwLock<HashMap<VoiceId, Arc<Style>>>,
}

impl StyleStore {
    pub fn new<P: Into<std::path::PathBuf>>(asset_root: P) -> Self {
        StyleStore {
            asset_root: asset_root.into(),
            cache: RwLock::new(HashMap::new()),
        }
    }

    pub fn get(&self, voice: VoiceId) -> Result<Arc<Style>, SupertonicError> {
        if let Some(style) = self.cache.read().unwrap().get(&voice) {
            return Ok(Arc::clone(style));
        }

        let path = self
            .asset_root
            .join("voice_styles")
            .join(voice.asset_filename());
        let bytes = std::fs::read(&path)?;
        let style = Arc::new(parse_voice_style(&bytes)?);

        let mut cache = self.cache.write().unwrap();
        let entry = cache.entry(voice).or_insert_with(|| Arc::clone(&style));
        Ok(Arc::clone(entry))
    }
}

/// A process-wide default store keyed by asset root, mirroring the session
/// manager's single-init discipline for the common case of one asset root
/// per process.
static DEFAULT_STORE: OnceCell<RwLock<HashMap<std::path::PathBuf, Arc<StyleStore>>>> =
    OnceCell::new();

pub fn style_store_for(asset_root: &std::path::Path) -> Arc<StyleStore> {
    let stores = DEFAULT_STORE.get_or_init(|| RwLock::new(HashMap::new()));

    if let Some(store) = stores.read().unwrap().get(asset_root) {
        return Arc::clone(store);
    }

    let mut guard = stores.write().unwrap();
    let entry = guard
        .entry(asset_root.to_path_buf())
        .or_insert_with(|| Arc::new(StyleStore::new(asset_root)));
    Arc::clone(entry)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_style_json(first_dim: usize) -> String {
        format!(
            r#"{{"style_ttl":{{"data":[[[0.1,0.2]]],"dims":[{first_dim},1,2],"type":"float32"}},"style_dp":{{"data":[[[0.3,0.4]]],"dims":[{first_dim},1,2],"type":"float32"}}}}"#
        )
    }

    #[test]
    fn parses_single_speaker_style() {
        let json = sample_style_json(1);
        let style = parse_voice_style(json.as_bytes()).unwrap();
        assert_eq!(style.ttl.shape(), &[1, 1, 2]);
        assert_eq!(style.dp.shape(), &[1, 1, 2]);
    }

    #[test]
    fn rejects_multi_speaker_style() {
        let json = sample_style_json(2);
        let err = parse_voice_style(json.as_bytes()).unwrap_err();
        assert!(matches!(err, SupertonicError::ShapeMismatch { .. }));
    }

    #[test]
    fn voice_id_parses_closed_set() {
        assert_eq!("F1".parse::<VoiceId>().unwrap(), VoiceId::F1);
        assert!("F3".parse::<VoiceId>().is_err());
    }
}
