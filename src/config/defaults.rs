/// Configuration default values
///
/// All defaults for configuration options live here so they can be changed in
/// one place.
// Config file location
pub const DEFAULT_CONFIG_FILE: &str = "vod-probe.toml";
pub const CONFIG_FILE_ENV: &str = "CONFIG_FILE";

// Probe defaults
pub const DEFAULT_TIMEOUT: &str = "10s";
pub const DEFAULT_RETRY_COUNT: u32 = 3;
pub const DEFAULT_RETRY_DELAY: &str = "200ms";
pub const DEFAULT_CONCURRENT_REQUESTS: usize = 4;
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";
pub const DEFAULT_KEYWORDS: &[&str] =
    &["肖申克的救赎", "泰坦尼克号", "星际穿越", "寻梦环游记"];

// Stream probe defaults
pub const DEFAULT_STREAM_ENABLED: bool = true;
pub const DEFAULT_TEST_RESULT_COUNT: usize = 5;
pub const DEFAULT_STREAM_TIMEOUT: &str = "30s";
pub const DEFAULT_MAX_STREAM_TEST_SIZE: u64 = 2 * 1024 * 1024; // 2MiB
pub const DEFAULT_DOWNLOAD_SPEED_TEST: bool = true;

// Resolver defaults
pub const DEFAULT_ACCEPTED_FLAGS: &[&str] =
    &["m3u8", "http", "hls", "mp4", "lzm3u8", "subm3u8", "wjm3u8"];
pub const DEFAULT_MAX_MANIFEST_DEPTH: u8 = 2;

// Ranking weight defaults, summing to 1
pub const DEFAULT_WEIGHT_SEARCH_TIME: f64 = 0.10;
pub const DEFAULT_WEIGHT_DETAIL_TIME: f64 = 0.05;
pub const DEFAULT_WEIGHT_STREAM_TIME: f64 = 0.50;
pub const DEFAULT_WEIGHT_SUCCESS_RATE: f64 = 0.20;
pub const DEFAULT_WEIGHT_RESULT_COUNT: f64 = 0.15;
pub const WEIGHT_SUM_TOLERANCE: f64 = 0.001;

// Report defaults
pub const DEFAULT_OUTPUT_DIR: &str = "./reports";
pub const DEFAULT_WRITE_HTML: bool = true;

// Endpoints written into a fresh config file
pub const DEFAULT_ENDPOINTS: &[(&str, &str, bool)] = &[
    ("如意资源", "https://cj.rycjapi.com/api.php/provide/vod", false),
    ("电影天堂", "https://caiji.dyttzyapi.com/api.php/provide/vod", false),
    ("暴风资源", "https://bfzyapi.com/api.php/provide/vod", false),
    ("天涯资源", "https://tyyszy.com/api.php/provide/vod", false),
    ("非凡资源", "https://cj.ffzyapi.com/api.php/provide/vod", false),
    ("卧龙资源", "https://wolongzyw.com/api.php/provide/vod", false),
    ("量子资源", "https://cj.lziapi.com/api.php/provide/vod", false),
];
