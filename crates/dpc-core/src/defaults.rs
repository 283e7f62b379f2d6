/// Entity key prefixes. Keys are `"{TYPE}_{Name}"`.
pub const BASE_PREFIX: &str = "BASE_";
pub const CTE_PREFIX: &str = "CTE_";
pub const VIEW_PREFIX: &str = "VIEW_";

/// Canvas node ids are `"{NODE_ID_PREFIX}{n}"`, assigned sequentially.
pub const NODE_ID_PREFIX: &str = "node-";

/// Canvas connection ids are `"{EDGE_ID_PREFIX}{n}"`.
pub const EDGE_ID_PREFIX: &str = "edge-";

/// Separator between node id and field name in attribute toggle keys.
pub const TOGGLE_KEY_SEPARATOR: char = '_';

/// Horizontal spacing between nodes placed without an explicit position.
pub const NODE_SPACING_X: f64 = 320.0;

/// Persisted product files written by this engine carry this version.
/// Files without `nodeIds` predate stable identity.
pub const PRODUCT_FORMAT_VERSION: u32 = 2;
