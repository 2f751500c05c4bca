// Print a bcrypt hash for an allow-list entry's `password_hash`
// Usage: cargo run --bin gen_hash -- <password>

fn main() -> anyhow::Result<()> {
    let password = std::env::args()
        .nth(1)
        .ok_or_else(|| anyhow::anyhow!("usage: gen_hash <password>"))?;

    let hash = bcrypt::hash(&password, bcrypt::DEFAULT_COST)?;
    anyhow::ensure!(bcrypt::verify(&password, &hash)?, "hash verification failed");

    println!("password_hash = \"{}\"", hash);
    Ok(())
}
