fn main() {
    slint_build::compile("ui/dashboard.slint").expect("failed to compile dashboard.slint");
}
