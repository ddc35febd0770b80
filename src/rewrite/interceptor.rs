//! Browser-side interceptor generator.
//!
//! # Responsibilities
//! - Emit the origin codec as client script, keyed from the same `OriginCodec`
//!   the server uses
//! - Emit `resolve(url)`, the client mirror of the proxy link rules
//! - Hook `fetch`, `XMLHttpRequest.open` and the loadable element setters
//! - Disable `window.open` and the `window.__open` alias
//!
//! # Data Flow
//! ```text
//! OriginCodec ──► client_codec() ──┐
//! MOUNT_PREFIX ────────────────────┼──► render() ──► <script data-proxy-interceptor>
//! RUNTIME template ────────────────┘
//! ```
//!
//! # Design Decisions
//! - The page token is read back from the injected `<base>`, so one rendering
//!   serves every page of a deployment
//! - Each hook is installed inside `try`; a missing constructor is skipped
//! - The script text stays stable under the HTML pass: no `url(` calls,
//!   no quoted attribute assignments, no protocol-relative literals

use crate::codec::{EncodingScheme, OriginCodec};
use crate::routing::{FULL_URL_SEGMENT, MOUNT_PREFIX};

/// Attribute carried by the injected script; its presence means the page
/// was already rewritten.
pub const INTERCEPTOR_MARKER: &str = "data-proxy-interceptor";

const XOR_HEX_CODEC: &str = concat!(
    "var K=[__KEY__];",
    "function E(s){var b=new TextEncoder().encode(s),o=\"\";",
    "for(var i=0;i<b.length;i++){var x=K.length?b[i]^K[i%K.length]:b[i];o+=(x<16?\"0\":\"\")+x.toString(16)}",
    "return o}",
    "function D(h){if(!/^(?:[0-9a-fA-F]{2})+$/.test(h))throw new Error(\"token\");",
    "var b=new Uint8Array(h.length/2);",
    "for(var i=0;i<b.length;i++){var x=parseInt(h.substr(i*2,2),16);b[i]=K.length?x^K[i%K.length]:x}",
    "return new TextDecoder(\"utf-8\",{fatal:true}).decode(b)}",
);

const BASE64_CODEC: &str = concat!(
    "function E(s){var b=new TextEncoder().encode(s),t=\"\";",
    "for(var i=0;i<b.length;i++)t+=String.fromCharCode(b[i]);",
    "return btoa(t).replace(/\\+/g,\"-\").replace(/\\//g,\"_\").replace(/=+$/,\"\")}",
    "function D(s){var t=s.replace(/=+$/,\"\").replace(/-/g,\"+\").replace(/_/g,\"/\");",
    "if(t.length%4===1)throw new Error(\"token\");while(t.length%4)t+=\"=\";",
    "var r=atob(t),b=new Uint8Array(r.length);",
    "for(var i=0;i<r.length;i++)b[i]=r.charCodeAt(i);",
    "return new TextDecoder(\"utf-8\",{fatal:true}).decode(b)}",
);

const RUNTIME: &str = concat!(
    "var N=function(){return null};window.open=N;window.__open=N;",
    "var P=\"__PREFIX__\",U=\"__FULL__\";",
    "var M=new RegExp(\"^\"+P+\"/([^/]+)(/.*)?$\");",
    "function B(){var e=document.querySelector(\"base\");return e&&e.href?e.href:location.href}",
    "function F(s,a){return P+\"/\"+U+\"/\"+E(s)+a.hash}",
    "function R(u){try{",
    "if(u==null)return u;var s=String(u);",
    "if(/^\\s*(?:data|blob|javascript):/i.test(s))return u;",
    "var b=B(),a=new URL(s,b);",
    "if(a.protocol!==\"http:\"&&a.protocol!==\"https:\")return u;",
    "if(a.origin!==location.origin)return F(a.origin+a.pathname+a.search,a);",
    "var m=a.pathname.match(M);",
    "if(m){if(m[1]===U)return u;return F(D(m[1])+(m[2]||\"/\")+a.search,a)}",
    "var t=new URL(b).pathname.match(M);",
    "if(t&&t[1]!==U)return P+\"/\"+t[1]+a.pathname+a.search+a.hash;",
    "return u}catch(e){return u}}",
    "if(window.fetch){var G=window.fetch;window.fetch=function(i,o){try{",
    "if(typeof i===\"string\"||(typeof URL!==\"undefined\"&&i instanceof URL))i=R(String(i));",
    "else if(i&&i.url)i=new Request(R(i.url),i)}catch(e){}",
    "return G.call(this,i,o)}}",
    "if(window.XMLHttpRequest){var X=XMLHttpRequest.prototype.open;",
    "XMLHttpRequest.prototype.open=function(m,u){if(arguments.length>1)arguments[1]=R(u);",
    "return X.apply(this,arguments)}}",
    "function W(n,p){try{var C=window[n];if(!C)return;var o=C.prototype,d=null;",
    "while(o&&!(d=Object.getOwnPropertyDescriptor(o,p)))o=Object.getPrototypeOf(o);",
    "if(!d||!d.set)return;var s=d.set;",
    "Object.defineProperty(C.prototype,p,{configurable:true,enumerable:d.enumerable,get:d.get,",
    "set:function(v){s.call(this,R(v))}})}catch(e){}}",
    "W(\"HTMLImageElement\",\"src\");W(\"HTMLScriptElement\",\"src\");",
    "W(\"HTMLAudioElement\",\"src\");W(\"HTMLVideoElement\",\"src\");",
    "W(\"HTMLSourceElement\",\"src\");W(\"HTMLIFrameElement\",\"src\");",
    "W(\"HTMLLinkElement\",\"href\");",
);

/// Client-side `E(string)` / `D(token)` matching `codec` byte for byte.
pub fn client_codec(codec: &OriginCodec) -> String {
    match codec.scheme() {
        EncodingScheme::XorHex => {
            let key = codec
                .key()
                .iter()
                .map(u8::to_string)
                .collect::<Vec<_>>()
                .join(",");
            XOR_HEX_CODEC.replace("__KEY__", &key)
        }
        EncodingScheme::Base64 => BASE64_CODEC.to_string(),
    }
}

/// The complete inline `<script>` element.
pub fn render(codec: &OriginCodec) -> String {
    let runtime = RUNTIME
        .replace("__PREFIX__", MOUNT_PREFIX)
        .replace("__FULL__", FULL_URL_SEGMENT);
    format!(
        "<script {INTERCEPTOR_MARKER}>(function(){{{}{}}})();</script>",
        client_codec(codec),
        runtime
    )
}
