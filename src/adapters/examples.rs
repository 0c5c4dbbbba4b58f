use crate::domain::{Case, Data, Endpoint, Location};
use std::sync::Arc;
use tracing::debug;

/// Cases built from literal `example` values on the endpoint's location schemas.
///
/// All examples are combined into a single case; no example means no case.
/// Examples are used verbatim and are not checked against their schemas.
pub fn examples_for(endpoint: impl Into<Arc<Endpoint>>) -> Vec<Case> {
    let endpoint = endpoint.into();
    let mut case = Case::for_endpoint(endpoint.clone());
    let mut found = false;

    for location in Location::ALL {
        let example = endpoint
            .schema(location)
            .and_then(|schema| schema.get("example"));
        if let Some(example) = example {
            case.set(location, Data::from(example));
            found = true;
        }
    }

    if found {
        debug!(method = %endpoint.method, path = %endpoint.path, "Using schema example");
        vec![case]
    } else {
        Vec::new()
    }
}
