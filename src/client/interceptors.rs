//! General-purpose request interceptors

use reqwest::header::{ACCEPT_LANGUAGE, HeaderValue};

use super::{Call, Dispatch, RequestInterceptor};
use crate::error::Result;

/// Sets `Accept-Language` on calls that do not carry one
#[derive(Debug, Clone)]
pub struct AcceptLanguageInterceptor {
    lang: Option<HeaderValue>,
}

impl AcceptLanguageInterceptor {
    /// An empty or invalid `lang` disables the interceptor
    pub fn new(lang: &str) -> Self {
        let lang = if lang.is_empty() {
            None
        } else {
            HeaderValue::from_str(lang)
                .inspect_err(|_| log::warn!("Ignoring invalid language {:?}", lang))
                .ok()
        };
        Self { lang }
    }
}

impl RequestInterceptor for AcceptLanguageInterceptor {
    fn intercept_request(&self, mut call: Call) -> Result<Dispatch> {
        if let Some(lang) = &self.lang
            && !call.headers.contains_key(ACCEPT_LANGUAGE)
        {
            call.headers.insert(ACCEPT_LANGUAGE, lang.clone());
        }
        Ok(Dispatch::Proceed(call))
    }
}
