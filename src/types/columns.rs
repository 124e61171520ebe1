//! Column names shared by the CSV files, the feature table and the model schema.

// Identity
pub const COL_CITY: &str = "city";
pub const COL_TIME: &str = "time";

// Open-Meteo daily fields
pub const COL_TMAX: &str = "temperature_2m_max";
pub const COL_TMIN: &str = "temperature_2m_min";
pub const COL_PRCP: &str = "precipitation_sum";

// NASA POWER fields
pub const COL_RHUM: &str = "relative_humidity_2m";
pub const COL_CLOUD: &str = "cloud_cover_proxy";
pub const COL_SOIL: &str = "soil_moisture_0_to_10cm";

// Derived
pub const COL_YEAR: &str = "year";
pub const COL_MONTH: &str = "month";
pub const COL_DAY_OF_YEAR: &str = "day_of_year";
pub const COL_PRCP_LAG1: &str = "precipitation_lag1";
pub const COL_PRCP_LAG2: &str = "precipitation_lag2";
pub const COL_MONSOON: &str = "is_monsoon";
pub const COL_SEASON: &str = "season";
pub const COL_TMAX_ROLLING_7: &str = "temp_rolling_7";

/// Fields filled by the iterative imputer.
pub const IMPUTED_COLUMNS: [&str; 3] = [COL_TMAX, COL_RHUM, COL_SOIL];

/// Fields returned by the Open-Meteo archive, in request order.
pub const BASIC_COLUMNS: [&str; 3] = [COL_TMAX, COL_TMIN, COL_PRCP];

/// Fields merged in from NASA POWER.
pub const ENHANCED_COLUMNS: [&str; 3] = [COL_RHUM, COL_CLOUD, COL_SOIL];
