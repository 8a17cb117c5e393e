fn main() {
    cardiorisk_lib::run()
}
