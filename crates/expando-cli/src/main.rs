fn main() {
    expando_cli::run_main();
}
