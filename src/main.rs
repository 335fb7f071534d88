fn main() {
    if let Err(err) = topology_layout::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
