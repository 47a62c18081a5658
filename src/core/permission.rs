use std::collections::HashSet;

use super::route::Method;

#[derive(Debug, Clone)]
pub struct Permission {
    pub client_id: String,
    pub route_id: String,
    pub allowed_methods: HashSet<Method>,
}

impl Permission {
    pub fn allows(&self, method: Method) -> bool {
        self.allowed_methods.contains(&method)
    }
}
