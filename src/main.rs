fn main() {
    flagquiz_lib::run()
}
