//! Query filter policies
//!
//! Each route turns caller input into [`FindArgs`] through one policy. The
//! passthrough policies hand the caller's filter to the store unchanged. The
//! overlay policies replace any top-level `published` key the caller wrote and
//! wrap the rest as `AND[published = true, <caller filter>]`, so the server
//! constraint sits outside anything the caller can write.

use serde_json::Value;

use crate::db::filter::{FilterError, FindArgs, Model, Parser, Predicate};

/// Top-level key the overlay policies own
const PUBLISHED_KEY: &str = "published";

/// How a route builds its query from caller input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterPolicy {
    /// `GET /articles`: the `filter` query parameter is the where object
    PassthroughQueryParam,
    /// `POST /articles/verybad`: the body's `filter` is the full argument object
    PassthroughBody,
    /// `POST /articles`: the body's `query` is narrowed to published articles
    OverlayPublished,
    /// `POST /articles/time-based`: as `OverlayPublished`, result discarded
    OverlayPublishedNoResult,
}

impl FilterPolicy {
    pub const ALL: [FilterPolicy; 4] = [
        FilterPolicy::PassthroughQueryParam,
        FilterPolicy::PassthroughBody,
        FilterPolicy::OverlayPublished,
        FilterPolicy::OverlayPublishedNoResult,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            FilterPolicy::PassthroughQueryParam => "passthrough_query_param",
            FilterPolicy::PassthroughBody => "passthrough_body",
            FilterPolicy::OverlayPublished => "overlay_published",
            FilterPolicy::OverlayPublishedNoResult => "overlay_published_no_result",
        }
    }

    /// Build the query for `input`; `None` means the caller sent no filter
    pub fn build(&self, input: Option<Value>) -> Result<FindArgs, FilterError> {
        let input = input.filter(|value| !value.is_null());

        match self {
            FilterPolicy::PassthroughQueryParam => match input {
                Some(value) => Ok(FindArgs::with_filter(
                    Parser::lenient().parse_where(Model::Article, &value)?,
                )),
                None => Ok(FindArgs::default()),
            },
            FilterPolicy::PassthroughBody => match input {
                Some(value) => Parser::strict().parse_find_args(&value),
                None => Ok(FindArgs::default()),
            },
            FilterPolicy::OverlayPublished | FilterPolicy::OverlayPublishedNoResult => {
                let mut value = input.ok_or(FilterError::MissingFilter)?;
                if let Some(object) = value.as_object_mut() {
                    object.remove(PUBLISHED_KEY);
                }
                let caller = Parser::strict().parse_where(Model::Article, &value)?;
                Ok(FindArgs::with_filter(Predicate::and(vec![
                    Predicate::published(true),
                    caller,
                ])))
            }
        }
    }

    /// The query runs but its outcome never reaches the response
    pub fn discards_result(&self) -> bool {
        matches!(self, FilterPolicy::OverlayPublishedNoResult)
    }

    /// Failures are reported to the operator log before being suppressed
    pub fn logs_failures(&self) -> bool {
        matches!(self, FilterPolicy::OverlayPublished)
    }
}
