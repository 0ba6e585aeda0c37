fn main() {
    whmcs_sync_dashboard_lib::run()
}
