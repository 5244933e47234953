//! Certificates minted at test time.

use rcgen::{
    date_time_ymd, BasicConstraints, Certificate, CertificateParams, DnType, IsCa, KeyPair,
    KeyUsagePurpose,
};
use rustls::pki_types::CertificateDer;

pub(crate) struct Issued {
    pub(crate) cert: Certificate,
    pub(crate) key: KeyPair,
}

impl Issued {
    pub(crate) fn der(&self) -> CertificateDer<'static> {
        self.cert.der().clone()
    }
}

#[derive(Clone, Copy)]
pub(crate) enum Validity {
    Current,
    Expired,
    NotYetValid,
}

fn leaf_params(validity: Validity) -> CertificateParams {
    let mut params = CertificateParams::new(vec!["localhost".to_string()]).unwrap();
    params.distinguished_name.push(DnType::CommonName, "localhost");
    match validity {
        Validity::Current => {}
        Validity::Expired => {
            params.not_before = date_time_ymd(2000, 1, 1);
            params.not_after = date_time_ymd(2001, 1, 1);
        }
        Validity::NotYetValid => {
            params.not_before = date_time_ymd(2200, 1, 1);
            params.not_after = date_time_ymd(2201, 1, 1);
        }
    }
    params
}

pub(crate) fn root_ca() -> Issued {
    let key = KeyPair::generate().unwrap();
    let mut params = CertificateParams::new(Vec::<String>::new()).unwrap();
    params.distinguished_name.push(DnType::CommonName, "certpin test root");
    params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
    params.key_usages = vec![
        KeyUsagePurpose::KeyCertSign,
        KeyUsagePurpose::CrlSign,
        KeyUsagePurpose::DigitalSignature,
    ];
    let cert = params.self_signed(&key).unwrap();
    Issued { cert, key }
}

pub(crate) fn leaf_signed_by(ca: &Issued, validity: Validity) -> Issued {
    let key = KeyPair::generate().unwrap();
    let cert = leaf_params(validity)
        .signed_by(&key, &ca.cert, &ca.key)
        .unwrap();
    Issued { cert, key }
}

pub(crate) fn self_signed(validity: Validity) -> Issued {
    let key = KeyPair::generate().unwrap();
    let cert = leaf_params(validity).self_signed(&key).unwrap();
    Issued { cert, key }
}
