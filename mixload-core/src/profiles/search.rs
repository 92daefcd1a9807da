use bytes::Bytes;
use rand::seq::SliceRandom as _;
use rand::{Rng as _, RngCore};
use serde::Serialize;

use crate::check::Check;
use crate::profile::{ProfileRequest, RequestBuilder};

const CHECK: Check = Check::new("search status 200", 200);

pub const SEARCH_KEYWORDS: [&str; 7] = ["Pro", "Phone", "Max", "Mini", "Ultra", "Plus", "Neo"];

#[derive(Debug, Serialize)]
struct SearchBody<'a> {
    column: &'a str,
    keyword: &'a str,
    page: u32,
    limit: u32,
}

/// Keyword search by product name: `POST /search` with a JSON body.
#[derive(Debug, Clone, Copy, Default)]
pub struct SearchProfile;

impl RequestBuilder for SearchProfile {
    fn build(&self, rng: &mut dyn RngCore) -> ProfileRequest {
        let keyword = SEARCH_KEYWORDS.choose(rng).copied().unwrap_or("Pro");
        let page = rng.gen_range(1..=3);

        let body = SearchBody {
            column: "name",
            keyword,
            page,
            limit: 5,
        };
        // Plain strings and integers always serialize.
        let body = serde_json::to_vec(&body).map(Bytes::from).unwrap_or_default();

        ProfileRequest::post("/search", body, CHECK).with_header("Content-Type", "application/json")
    }

    fn checks(&self) -> Vec<Check> {
        vec![CHECK]
    }
}
