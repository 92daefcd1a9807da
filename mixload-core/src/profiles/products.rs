use rand::{Rng as _, RngCore};

use crate::check::Check;
use crate::profile::{ProfileRequest, RequestBuilder};

const CHECK: Check = Check::new("products status 200", 200);
const PAGES: u32 = 10;
const LIMIT: u32 = 5;

/// Paginated catalog browsing: `GET /products?page=1..=10&limit=5`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProductsProfile;

impl RequestBuilder for ProductsProfile {
    fn build(&self, rng: &mut dyn RngCore) -> ProfileRequest {
        let page = rng.gen_range(1..=PAGES);
        ProfileRequest::get(format!("/products?page={page}&limit={LIMIT}"), CHECK)
    }

    fn checks(&self) -> Vec<Check> {
        vec![CHECK]
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng as _;
    use rand::rngs::SmallRng;

    use super::*;

    #[test]
    fn pages_stay_in_range() {
        let mut rng = SmallRng::seed_from_u64(7);
        for _ in 0..500 {
            let req = ProductsProfile.build(&mut rng);
            assert_eq!(req.method, http::Method::GET);
            let page: u32 = req
                .path
                .strip_prefix("/products?page=")
                .and_then(|rest| rest.strip_suffix("&limit=5"))
                .and_then(|p| p.parse().ok())
                .unwrap_or_else(|| panic!("unexpected path {}", req.path));
            assert!((1..=10).contains(&page));
            assert_eq!(req.check, CHECK);
        }
    }
}
