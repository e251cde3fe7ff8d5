#![forbid(unsafe_code)]

use path_absolutize::Absolutize;
use std::ops::Deref;
use std::path::Path;

use poem::Request;

use log::{debug, LevelFilter};

// ***************************************************************************
// GENERAL PUBLIC FUNCTIONS
// ***************************************************************************
// ---------------------------------------------------------------------------
// get_absolute_path:
// ---------------------------------------------------------------------------
/** Replace tilde (~) and environment variable values in a path name and
 * then construct the absolute path name.  Unlike canonicalize, absolutize
 * doesn't require the file to exist.  Any failure returns the original path.
 */
pub fn get_absolute_path(path: &str) -> String {
    let s = match shellexpand::full(path) {
        Ok(x) => x,
        Err(_) => return path.to_owned(),
    };

    let p = Path::new(s.deref());
    let p1 = match p.absolutize() {
        Ok(x) => x,
        Err(_) => return path.to_owned(),
    };
    match p1.to_str() {
        Some(x) => x.to_owned(),
        None => path.to_owned(),
    }
}

// ***************************************************************************
//                                  Traits
// ***************************************************************************
pub trait RequestDebug {
    fn get_request_info(&self) -> String;
}

// ---------------------------------------------------------------------------
// debug_request:
// ---------------------------------------------------------------------------
// Dump http request information to the log.
pub fn debug_request(http_req: &Request, req: &impl RequestDebug) {
    // Skip the formatting work unless debug logging is on.
    if log::max_level() < LevelFilter::Debug {
        return;
    }

    let mut s = "\n".to_string();
    s += format!("  URI: {:?}\n", http_req.uri()).as_str();
    for (name, value) in http_req.headers().iter() {
        s += format!("  Header: {} = {:?} \n", name, value).as_str();
    }
    s += format!("  Remote: {:?}\n", http_req.remote_addr()).as_str();
    s += req.get_request_info().as_str();

    debug!("{}", s);
}
