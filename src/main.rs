fn main() -> anyhow::Result<()> {
    orate_lib::run()
}
