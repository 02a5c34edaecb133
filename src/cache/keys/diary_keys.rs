/// 日记列表缓存键前缀
const DIARY_ENTRIES_PREFIX: &str = "diary:entries:";

/// 生成用户日记列表缓存键
pub fn diary_entries_key(user_id: &str) -> String {
    format!("{}{}", DIARY_ENTRIES_PREFIX, user_id)
}
