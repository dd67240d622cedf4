//! Canonicalization of legacy `?date=` sport URLs into path-based date routes.
//!
//! Two legacy shapes are recognized under a sport root:
//!
//! - `/{sport}?date=D` becomes `/{sport}/D`
//! - `/{sport}/prediction/{slug}?date=D` becomes `/{sport}/D/prediction/{slug}`
//!
//! Every other query parameter is carried over verbatim and in order. Anything
//! else passes through untouched.

use std::borrow::Cow;

use crate::routing::sport::Sport;

/// The query key that gets moved into the path.
pub const DATE_PARAM: &str = "date";

/// Per-request description of a redirect target. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteDescriptor {
    pub sport: Sport,
    /// Caller-supplied date, decoded, not checked for calendar correctness.
    pub date: String,
    pub prediction_slug: Option<String>,
    /// Raw `k=v` pairs other than `date`, in their original order.
    pub extra_params: Vec<String>,
}

/// Legacy URL shapes, checked in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoutePattern {
    /// `/{sport}`
    SportIndex,
    /// `/{sport}/prediction/{slug}`
    PredictionDetail,
}

impl RoutePattern {
    pub const ORDERED: [RoutePattern; 2] = [RoutePattern::SportIndex, RoutePattern::PredictionDetail];

    /// Match the part of the path following the sport segment.
    ///
    /// Returns `Some(slug)` on a match, where `slug` is `None` for the index shape.
    fn match_rest(self, rest: &str) -> Option<Option<&str>> {
        match self {
            Self::SportIndex => rest.is_empty().then_some(None),
            Self::PredictionDetail => rest
                .strip_prefix("/prediction/")
                .filter(|slug| !slug.is_empty())
                .map(Some),
        }
    }

    /// Destination path (without query) for a matched route.
    ///
    /// The date is not validated but is percent-encoded, so a value such as
    /// `2024/03/01` lands as the single segment `2024%2F03%2F01` instead of
    /// splitting into extra path segments. Page routing then rejects it.
    pub fn destination(self, route: &RouteDescriptor) -> String {
        let date = urlencoding::encode(&route.date);
        match (self, route.prediction_slug.as_deref()) {
            (Self::PredictionDetail, Some(slug)) => {
                format!("/{}/{date}/prediction/{slug}", route.sport)
            }
            _ => format!("/{}/{date}", route.sport),
        }
    }
}

/// A matched legacy URL and the permanent redirect it earns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirect {
    pub pattern: RoutePattern,
    pub route: RouteDescriptor,
}

impl Redirect {
    /// Full `Location` value: destination path plus the preserved parameters.
    pub fn location(&self) -> String {
        let mut location = self.pattern.destination(&self.route);
        if !self.route.extra_params.is_empty() {
            location.push('?');
            location.push_str(&self.route.extra_params.join("&"));
        }
        location
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RewriteOutcome {
    Redirect(Redirect),
    PassThrough,
}

/// Split a path into its sport root and the remainder, if the root is a sport.
///
/// `/football` and `/football/...` qualify, `/footballer` does not.
pub fn sport_root(path: &str) -> Option<(Sport, &str)> {
    let trimmed = path.strip_prefix('/')?;
    let (segment, rest) = match trimmed.find('/') {
        Some(idx) => trimmed.split_at(idx),
        None => (trimmed, ""),
    };
    let sport = segment.parse::<Sport>().ok()?;
    Some((sport, rest))
}

/// Classify a request URL and build its redirect, if any.
pub fn rewrite(path: &str, query: Option<&str>) -> RewriteOutcome {
    let Some((sport, rest)) = sport_root(path) else {
        return RewriteOutcome::PassThrough;
    };

    // Extracted once, shared by every pattern below.
    let (date, extra_params) = split_date(query.unwrap_or_default());
    let Some(date) = date else {
        return RewriteOutcome::PassThrough;
    };

    for pattern in RoutePattern::ORDERED {
        if let Some(slug) = pattern.match_rest(rest) {
            return RewriteOutcome::Redirect(Redirect {
                pattern,
                route: RouteDescriptor {
                    sport,
                    date: date.into_owned(),
                    prediction_slug: slug.map(str::to_string),
                    extra_params: extra_params.into_iter().map(str::to_string).collect(),
                },
            });
        }
    }

    RewriteOutcome::PassThrough
}

/// Pull the first non-empty `date` value out of a raw query string.
///
/// All `date` pairs are dropped from the remainder; other pairs are returned
/// exactly as they appeared.
fn split_date(query: &str) -> (Option<Cow<'_, str>>, Vec<&str>) {
    let mut date = None;
    let mut rest = Vec::new();

    for pair in query.split('&').filter(|p| !p.is_empty()) {
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        if decode_component(key) != DATE_PARAM {
            rest.push(pair);
            continue;
        }
        if date.is_none() {
            let value = decode_component(value);
            if !value.is_empty() {
                date = Some(value);
            }
        }
    }

    (date, rest)
}

/// Form-style decoding: `+` is a space, malformed escapes are kept as-is.
fn decode_component(raw: &str) -> Cow<'_, str> {
    let spaced: Cow<'_, str> = if raw.contains('+') {
        Cow::Owned(raw.replace('+', " "))
    } else {
        Cow::Borrowed(raw)
    };
    let decoded = match urlencoding::decode(&spaced) {
        Ok(Cow::Owned(decoded)) => Some(decoded),
        _ => None,
    };
    decoded.map_or(spaced, Cow::Owned)
}
