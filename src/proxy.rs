//! Base-path rewriting for services mounted under a prefix by a proxy.
//!
//! Some gateways route `/v1/foo` to a service but forward only `/foo`,
//! announcing the stripped prefix in a header (`x-micro-web-base-path` by
//! default). The router puts the prefix back before matching so routes are
//! declared with their public paths.

use http::Uri;
use http::uri::PathAndQuery;
use tracing::{debug, warn};

use crate::request::Request;

/// Header carrying the stripped prefix, unless configured otherwise.
pub const DEFAULT_BASE_PATH_HEADER: &str = "x-micro-web-base-path";

/// Re-attaches the base path announced in `header`.
///
/// The URI path, `request_uri`, and `path_info` are all prefixed. Trailing
/// slashes on the header value are dropped before joining, so a base of
/// `/v1/` gives `/v1/foo` rather than `/v1//foo`, and a base of just `/`
/// counts as no base. An incoming path of `/` maps to the base path itself
/// (`/v1`, never `/v1/`). Without the header the request is returned as is.
pub(crate) fn restore_base_path(req: Request, header: &str) -> Request {
    let line = req.header_line(header);
    let base = line.trim_end_matches('/');
    if base.is_empty() {
        return req;
    }

    let uri = match prefixed_uri(req.uri(), base) {
        Ok(uri) => uri,
        Err(e) => {
            warn!(base, path = req.path(), "ignoring unusable base path: {e}");
            return req;
        }
    };
    let mut params = req.server_params().clone();
    params.request_uri = prefixed(base, &params.request_uri);
    params.path_info = prefixed(base, &params.path_info);

    debug!(base, path_info = %params.path_info, "restored proxy base path");
    req.with_uri(uri).with_server_params(params)
}

fn prefixed(base: &str, value: &str) -> String {
    if value == "/" {
        base.to_owned()
    } else {
        format!("{base}{value}")
    }
}

fn prefixed_uri(uri: &Uri, base: &str) -> Result<Uri, http::Error> {
    let path = prefixed(base, uri.path());
    let path_and_query = match uri.query() {
        Some(query) => format!("{path}?{query}"),
        None => path,
    };
    let mut parts = uri.clone().into_parts();
    parts.path_and_query = Some(PathAndQuery::try_from(path_and_query)?);
    Ok(Uri::from_parts(parts)?)
}
