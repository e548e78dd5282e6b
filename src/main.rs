fn main() {
    if let Err(err) = catalog_reconcile::run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
