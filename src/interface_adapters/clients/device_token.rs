// Device credential verification. The production check is a stub pending a
// real device-auth scheme, mirroring the upstream TODO this relay was
// rebuilt from: any non-empty device name is accepted.

use async_trait::async_trait;

use crate::domain::ports::DeviceTokenVerifier;

pub struct PermissiveDeviceTokenVerifier;

#[async_trait]
impl DeviceTokenVerifier for PermissiveDeviceTokenVerifier {
    async fn verify(&self, device_name: &str, _token_rest: &str) -> bool {
        !device_name.is_empty()
    }
}
