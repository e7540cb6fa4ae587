/// Shared constants for roster filtering, map focus and backend field names.

/// Fixed number of roster rows per page.
pub const PAGE_SIZE: usize = 10;

/// Role code carried by the identity collaborator for cross-user visibility.
pub const ELEVATED_ROLE_CODE: i64 = 1;

/// Display name used by the backend (and the export) for voters with no assigned user.
pub const UNASSIGNED_USER: &str = "SIN ASIGNAR";

/// Zoom level applied when focusing a single municipality.
pub const FOCUS_ZOOM: u8 = 9;

/// Initial map view over the Caribbean region.
pub const DEFAULT_MAP_CENTER: (f64, f64) = (9.5, -74.8);
pub const DEFAULT_MAP_ZOOM: u8 = 6;

/// Default quiescence window for search-as-you-type.
pub const DEFAULT_SEARCH_DEBOUNCE_MS: u64 = 300;

/// Default number of rows shown in the "latest entries" table.
pub const RECENT_ENTRIES_LIMIT: usize = 10;

// Backend field names for place aggregate rows
pub const FIELD_PLACE_NAME: &str = "MUNICIPIO";
pub const FIELD_DEPARTMENT_NAME: &str = "DEPARTAMENTO";
pub const FIELD_VOTER_TOTAL: &str = "TOTAL";
pub const FIELD_LEADER_ID: &str = "LIDER_MUNICIPIO";
pub const FIELD_LEADER_NAME: &str = "NOMBRE_LIDER";

// Backend field names for voter roster rows
pub const FIELD_DOC_ID: &str = "NUM_DOC";
pub const FIELD_FULL_NAME: &str = "NOMBRE_COMPLETO";
pub const FIELD_TABLE: &str = "MESA";
pub const FIELD_PRECINCT: &str = "PUESTO";
pub const FIELD_POLLING_PLACE: &str = "LUGAR_VOTACION";
pub const FIELD_ZONE_NAME: &str = "ZONA_NOMBRE";
pub const FIELD_ASSIGNED_USER: &str = "USUARIO_NOMBRE";
pub const FIELD_CREATED_AT: &str = "CREADO_EN";

/// Timestamp layouts the backend has been seen to emit for `CREADO_EN`.
pub const CREATED_AT_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d"];
