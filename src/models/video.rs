#[derive(Debug, Clone, PartialEq)]
pub struct Short {
    pub id: String,
    pub title: String,
    pub url: String,
    pub thumbnail: String,
}

/// Per-channel fetch outcome; one channel failing never taints another.
#[derive(Debug, Clone)]
pub struct ChannelShorts {
    pub name: String,
    pub url: String,
    pub result: std::result::Result<Vec<Short>, String>,
}
