use serde::Deserialize;
use utoipa::IntoParams;

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub(crate) struct TranscriptParams {
    /// Preferred language tags, comma separated, most preferred first. Defaults to `en`.
    #[param(example = "en")]
    pub(crate) lang: Option<String>,
}

impl TranscriptParams {
    pub(crate) fn languages(&self) -> Vec<String> {
        self.lang
            .as_deref()
            .map(|lang| lang.split(',').map(|tag| tag.trim().to_string()).collect())
            .unwrap_or_default()
    }
}
