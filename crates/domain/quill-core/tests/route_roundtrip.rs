//! Property tests for the persisted and URL forms of routes.

use proptest::prelude::*;
use quill_core::{PostRoute, Route};

fn route_strategy() -> impl Strategy<Value = Route> {
    prop_oneof![
        Just(Route::NotFound),
        Just(Route::Login),
        Just(Route::NewPost),
        ".{0,24}".prop_map(Route::search),
        (
            any::<u64>(),
            proptest::option::of(".{0,24}"),
            any::<bool>()
        )
            .prop_map(|(id, title, editing)| {
                let mut route = PostRoute::new(id, title, false);
                route.editing = editing;
                Route::Post(route)
            }),
    ]
}

proptest! {
    #[test]
    fn json_roundtrip_preserves_observable_fields(route in route_strategy()) {
        let back = Route::from_json(&route.to_json()).unwrap();
        prop_assert_eq!(back, route);
    }

    #[test]
    fn url_roundtrip_preserves_name_and_params(route in route_strategy()) {
        prop_assume!(route != Route::NotFound);
        let decoded = Route::from_url(&route.path_with_params()).unwrap();
        prop_assert_eq!(decoded.name(), route.name());
        prop_assert_eq!(decoded.path_with_params(), route.path_with_params());
    }
}
