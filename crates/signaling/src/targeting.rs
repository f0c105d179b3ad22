//! Zielauswahl fuer Operator-Befehle
//!
//! Bestimmt, welche registrierten Instanz-Clients einen Befehl erhalten.
//! Namen werden ohne Beachtung der Gross-/Kleinschreibung verglichen,
//! Teilnehmer-IDs numerisch. Sind ID und Name gesetzt, muessen beide
//! passen.

use relay_core::Identitaet;
use relay_protocol::{ServerNachricht, Ziel};
use std::sync::Arc;

use crate::registry::ConnectionRegistry;
use crate::session::Session;

/// Prueft ob eine Identitaet vom Ziel erfasst wird
pub fn trifft_zu(ziel: &Ziel, identitaet: &Identitaet) -> bool {
    match ziel {
        Ziel::Alle => true,
        Ziel::Teilnehmer(id) => identitaet.teilnehmer == *id,
        Ziel::Anzeigename(name) => namen_gleich(&identitaet.anzeigename, name),
        Ziel::TeilnehmerUndName {
            teilnehmer,
            anzeigename,
        } => {
            identitaet.teilnehmer == *teilnehmer
                && namen_gleich(&identitaet.anzeigename, anzeigename)
        }
    }
}

fn namen_gleich(a: &str, b: &str) -> bool {
    a.to_lowercase() == b.to_lowercase()
}

/// Ergebnis einer Zustellung
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Zustellung {
    /// Vom Ziel erfasste Clients
    pub getroffen: usize,
    /// Davon erfolgreich in die Send-Queue gelegt
    pub zugestellt: usize,
}

/// Loest Ziele gegen die Registry auf
#[derive(Clone)]
pub struct TargetingResolver {
    registry: ConnectionRegistry,
}

impl TargetingResolver {
    pub fn neu(registry: ConnectionRegistry) -> Self {
        Self { registry }
    }

    /// Alle registrierten Sessions, die das Ziel erfasst
    pub fn aufloesen(&self, ziel: &Ziel) -> Vec<Arc<Session>> {
        let mut treffer = Vec::new();
        self.registry.fuer_jeden(|session| {
            if session
                .identitaet()
                .is_some_and(|identitaet| trifft_zu(ziel, identitaet))
            {
                treffer.push(Arc::clone(session));
            }
        });
        treffer
    }

    /// Legt die Nachricht in die Send-Queue jedes getroffenen Clients
    ///
    /// Volle oder geschlossene Queues werden uebersprungen; sie zaehlen als
    /// getroffen, aber nicht als zugestellt.
    pub fn zustellen(&self, ziel: &Ziel, nachricht: &ServerNachricht) -> Zustellung {
        let treffer = self.aufloesen(ziel);
        let zugestellt = treffer
            .iter()
            .filter(|session| session.senden(nachricht.clone()))
            .count();
        Zustellung {
            getroffen: treffer.len(),
            zugestellt,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relay_core::{LaufId, TeilnehmerId, WeltId};
    use relay_protocol::ServerNachricht;
    use tokio::sync::mpsc;

    fn instanz(
        registry: &ConnectionRegistry,
        teilnehmer: i64,
        name: &str,
    ) -> (Arc<Session>, mpsc::Receiver<ServerNachricht>) {
        let (tx, rx) = mpsc::channel(4);
        let session = Session::neu(tx, None);
        session.als_instanz_registrieren(
            Identitaet::neu(
                WeltId::neu("w1").unwrap(),
                LaufId::neu(format!("job-{teilnehmer}")).unwrap(),
                TeilnehmerId::neu(teilnehmer).unwrap(),
                name,
            )
            .unwrap(),
        );
        let session = Arc::new(session);
        registry.registrieren(Arc::clone(&session));
        (session, rx)
    }

    fn tid(wert: i64) -> TeilnehmerId {
        TeilnehmerId::neu(wert).unwrap()
    }

    #[test]
    fn alle_trifft_jeden() {
        let registry = ConnectionRegistry::neu();
        let _a = instanz(&registry, 1, "Alice");
        let _b = instanz(&registry, 2, "Bob");
        let resolver = TargetingResolver::neu(registry);
        assert_eq!(resolver.aufloesen(&Ziel::Alle).len(), 2);
    }

    #[test]
    fn name_ohne_gross_kleinschreibung() {
        let registry = ConnectionRegistry::neu();
        let (alice, _rx) = instanz(&registry, 1, "Alice");
        let _b = instanz(&registry, 2, "Bob");
        let resolver = TargetingResolver::neu(registry);

        let treffer = resolver.aufloesen(&Ziel::Anzeigename("aLiCe".into()));
        assert_eq!(treffer.len(), 1);
        assert_eq!(treffer[0].id(), alice.id());
    }

    #[test]
    fn id_und_name_muessen_beide_passen() {
        let registry = ConnectionRegistry::neu();
        let _a = instanz(&registry, 1, "Alice");
        let _b = instanz(&registry, 2, "Bob");
        let resolver = TargetingResolver::neu(registry);

        let passend = Ziel::TeilnehmerUndName {
            teilnehmer: tid(1),
            anzeigename: "alice".into(),
        };
        assert_eq!(resolver.aufloesen(&passend).len(), 1);

        let widerspruechlich = Ziel::TeilnehmerUndName {
            teilnehmer: tid(1),
            anzeigename: "Bob".into(),
        };
        assert!(resolver.aufloesen(&widerspruechlich).is_empty());
    }

    #[test]
    fn gleiche_id_in_mehreren_laeufen() {
        let registry = ConnectionRegistry::neu();
        let (tx, _rx) = mpsc::channel(1);
        let zweite = Session::neu(tx, None);
        zweite.als_instanz_registrieren(
            Identitaet::neu(
                WeltId::neu("w2").unwrap(),
                LaufId::neu("anderer-job").unwrap(),
                tid(1),
                "Alice",
            )
            .unwrap(),
        );
        registry.registrieren(Arc::new(zweite));
        let _a = instanz(&registry, 1, "Alice");

        let resolver = TargetingResolver::neu(registry);
        assert_eq!(resolver.aufloesen(&Ziel::Teilnehmer(tid(1))).len(), 2);
    }

    #[test]
    fn zustellen_zaehlt_treffer() {
        let registry = ConnectionRegistry::neu();
        let (_alice, mut rx_a) = instanz(&registry, 1, "Alice");
        let (_bob, mut rx_b) = instanz(&registry, 2, "Bob");
        let resolver = TargetingResolver::neu(registry);

        let nachricht = ServerNachricht::antwort("x");
        let zustellung = resolver.zustellen(&Ziel::Teilnehmer(tid(2)), &nachricht);
        assert_eq!(
            zustellung,
            Zustellung {
                getroffen: 1,
                zugestellt: 1
            }
        );
        assert!(rx_a.try_recv().is_err());
        assert_eq!(rx_b.try_recv().unwrap(), nachricht);

        let leer = resolver.zustellen(&Ziel::Anzeigename("Carol".into()), &nachricht);
        assert_eq!(leer, Zustellung::default());
    }
}
