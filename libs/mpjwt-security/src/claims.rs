//! Standard claim names recognized by the MP-JWT profile.
//!
//! Every standard claim has a fixed value type. The injection layer uses it to
//! reject declarations that ask for a claim in an incompatible shape, and the
//! token model uses it to normalize the JSON payload (`aud` given as a single
//! string still becomes a set).

use std::fmt;
use std::str::FromStr;

/// Value type carried by a standard claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ClaimType {
    String,
    Long,
    Boolean,
    StringSet,
    JsonObject,
}

macro_rules! standard_claims {
    ($( $variant:ident => ($name:literal, $ty:ident, $desc:literal) ),+ $(,)?) => {
        /// Standard claims that can be selected by enum instead of by literal name.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum Claims {
            $(
                #[doc = $desc]
                $variant,
            )+
        }

        impl Claims {
            /// All standard claims in declaration order.
            pub const ALL: &'static [Claims] = &[$(Claims::$variant),+];

            /// Canonical claim name as it appears in the token payload.
            #[must_use]
            pub const fn name(self) -> &'static str {
                match self {
                    $(Claims::$variant => $name,)+
                }
            }

            /// Fixed value type of the claim.
            #[must_use]
            pub const fn claim_type(self) -> ClaimType {
                match self {
                    $(Claims::$variant => ClaimType::$ty,)+
                }
            }

            #[must_use]
            pub const fn description(self) -> &'static str {
                match self {
                    $(Claims::$variant => $desc,)+
                }
            }

            /// Look up a standard claim by its canonical name.
            #[must_use]
            pub fn from_name(name: &str) -> Option<Self> {
                match name {
                    $($name => Some(Claims::$variant),)+
                    _ => None,
                }
            }
        }
    };
}

standard_claims! {
    Iss => ("iss", String, "Issuer"),
    Sub => ("sub", String, "Subject"),
    Aud => ("aud", StringSet, "Audience"),
    Exp => ("exp", Long, "Expiration time"),
    Iat => ("iat", Long, "Issued at time"),
    Jti => ("jti", String, "JWT ID"),
    Upn => ("upn", String, "MP-JWT specific unique principal name"),
    Groups => ("groups", StringSet, "MP-JWT specific groups permission grant"),
    RawToken => ("raw_token", String, "MP-JWT specific original bearer token"),
    Nbf => ("nbf", Long, "Not before"),
    AuthTime => ("auth_time", Long, "Time when the authentication occurred"),
    UpdatedAt => ("updated_at", Long, "Time the information was last updated"),
    Azp => ("azp", String, "Authorized party - the party to which the ID Token was issued"),
    Nonce => ("nonce", String, "Value used to associate a client session with an ID Token"),
    AtHash => ("at_hash", Long, "Access Token hash value"),
    CHash => ("c_hash", Long, "Code hash value"),
    FullName => ("full_name", String, "Full name"),
    FamilyName => ("family_name", String, "Surname(s) or last name(s)"),
    MiddleName => ("middle_name", String, "Middle name(s)"),
    Nickname => ("nickname", String, "Casual name"),
    GivenName => ("given_name", String, "Given name(s) or first name(s)"),
    PreferredUsername => ("preferred_username", String, "Shorthand name by which the End-User wishes to be referred to"),
    Email => ("email", String, "Preferred e-mail address"),
    EmailVerified => ("email_verified", Boolean, "True if the e-mail address has been verified"),
    Gender => ("gender", String, "Gender"),
    Birthdate => ("birthdate", String, "Birthday"),
    Zoneinfo => ("zoneinfo", String, "Time zone"),
    Locale => ("locale", String, "Locale"),
    PhoneNumber => ("phone_number", String, "Preferred telephone number"),
    PhoneNumberVerified => ("phone_number_verified", Boolean, "True if the phone number has been verified"),
    Address => ("address", JsonObject, "Preferred postal address"),
    Acr => ("acr", String, "Authentication Context Class Reference"),
    Amr => ("amr", String, "Authentication Methods References"),
    SubJwk => ("sub_jwk", JsonObject, "Public key used to check the signature of an ID Token"),
    Cnf => ("cnf", String, "Confirmation"),
    SipFromTag => ("sip_from_tag", String, "SIP From tag header field parameter value"),
    SipDate => ("sip_date", String, "SIP Date header field value"),
    SipCallid => ("sip_callid", String, "SIP Call-Id header field value"),
    SipCseqNum => ("sip_cseq_num", String, "SIP CSeq numeric header field parameter value"),
    SipViaBranch => ("sip_via_branch", String, "SIP Via branch header field parameter value"),
    Orig => ("orig", String, "Originating Identity String"),
    Dest => ("dest", String, "Destination Identity String"),
    Mky => ("mky", String, "Media Key Fingerprint String"),
    Jwk => ("jwk", JsonObject, "JSON Web Key Representing Public Key"),
    Jwe => ("jwe", String, "Encrypted JSON Web Key"),
    Kid => ("kid", String, "Key identifier"),
    Jku => ("jku", String, "JWK Set URL"),
}

impl fmt::Display for Claims {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error returned when parsing a name that is not a standard claim.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("'{0}' is not a standard claim name")]
pub struct UnknownClaim(pub String);

impl FromStr for Claims {
    type Err = UnknownClaim;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s).ok_or_else(|| UnknownClaim(s.to_owned()))
    }
}
