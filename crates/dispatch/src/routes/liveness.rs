pub async fn handler() -> &'static str {
    "I work uwu"
}
