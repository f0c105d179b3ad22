//! Connection-Registry – Welt -> Lauf -> Teilnehmer -> Session
//!
//! Haelt alle registrierten Instanz-Clients. Eine Registrierung mit einem
//! bereits belegten Schluessel ersetzt den vorherigen Eintrag; das
//! Abmelden entfernt nur, was die abmeldende Session selbst eingetragen
//! hat. Leere Welt- und Lauf-Ebenen werden sofort entfernt.
//!
//! Alle Operationen laufen unter einem einzigen `RwLock`, Leser sehen also
//! nie einen halb eingetragenen Client.

use parking_lot::RwLock;
use relay_core::{LaufId, TeilnehmerId, WeltId};
use relay_protocol::ClientZusammenfassung;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::session::Session;

type TeilnehmerTabelle = BTreeMap<TeilnehmerId, Arc<Session>>;
type LaufTabelle = BTreeMap<LaufId, TeilnehmerTabelle>;

/// Ergebnis einer Registrierung
#[derive(Debug)]
pub enum RegistrierErgebnis {
    /// Schluessel war frei
    Neu,
    /// Schluessel war belegt; enthaelt die verdraengte Session
    Ersetzt(Arc<Session>),
    /// Session war bereits geschlossen oder hat keine Identitaet
    Abgelehnt,
}

/// Registry aller Instanz-Clients
///
/// Clone teilt den inneren Zustand.
#[derive(Clone, Default)]
pub struct ConnectionRegistry {
    welten: Arc<RwLock<BTreeMap<WeltId, LaufTabelle>>>,
}

impl ConnectionRegistry {
    /// Erstellt eine leere Registry
    pub fn neu() -> Self {
        Self::default()
    }

    /// Traegt eine Session unter ihrer Identitaet ein
    pub fn registrieren(&self, session: Arc<Session>) -> RegistrierErgebnis {
        let Some(identitaet) = session.identitaet() else {
            tracing::warn!(verbindung = %session.id(), "Registrierung ohne Identitaet");
            return RegistrierErgebnis::Abgelehnt;
        };

        let mut welten = self.welten.write();
        // Unter dem Lock pruefen: eine parallel beendete Session darf keinen
        // verwaisten Eintrag hinterlassen
        if session.ist_geschlossen() {
            return RegistrierErgebnis::Abgelehnt;
        }

        let vorher = welten
            .entry(identitaet.welt.clone())
            .or_default()
            .entry(identitaet.lauf.clone())
            .or_default()
            .insert(identitaet.teilnehmer, Arc::clone(&session));
        drop(welten);

        match vorher {
            Some(alt) if alt.id() != session.id() => {
                tracing::debug!(
                    client = %identitaet,
                    alt = %alt.id(),
                    neu = %session.id(),
                    "Registry-Eintrag ersetzt"
                );
                RegistrierErgebnis::Ersetzt(alt)
            }
            _ => RegistrierErgebnis::Neu,
        }
    }

    /// Entfernt den Eintrag der Session, falls er noch ihr gehoert
    ///
    /// Gibt `true` zurueck wenn ein Eintrag entfernt wurde.
    pub fn abmelden(&self, session: &Session) -> bool {
        let Some(identitaet) = session.identitaet() else {
            return false;
        };

        let mut welten = self.welten.write();
        let Some(laeufe) = welten.get_mut(&identitaet.welt) else {
            return false;
        };
        let Some(teilnehmer) = laeufe.get_mut(&identitaet.lauf) else {
            return false;
        };
        match teilnehmer.get(&identitaet.teilnehmer) {
            Some(eingetragen) if eingetragen.id() == session.id() => {}
            // Schon von einer neueren Verbindung ersetzt
            _ => return false,
        }

        teilnehmer.remove(&identitaet.teilnehmer);
        if teilnehmer.is_empty() {
            laeufe.remove(&identitaet.lauf);
        }
        if laeufe.is_empty() {
            welten.remove(&identitaet.welt);
        }
        true
    }

    /// Momentaufnahme aller registrierten Sessions
    pub fn schnappschuss(&self) -> Vec<Arc<Session>> {
        self.welten
            .read()
            .values()
            .flat_map(|laeufe| laeufe.values())
            .flat_map(|teilnehmer| teilnehmer.values())
            .cloned()
            .collect()
    }

    /// Ruft `besucher` fuer jede registrierte Session auf
    ///
    /// Arbeitet auf einer Momentaufnahme; `besucher` darf die Registry
    /// veraendern.
    pub fn fuer_jeden(&self, mut besucher: impl FnMut(&Arc<Session>)) {
        for session in self.schnappschuss() {
            besucher(&session);
        }
    }

    /// Zusammenfassung aller Instanz-Clients fuer `listClients`
    pub fn zusammenfassungen(&self) -> Vec<ClientZusammenfassung> {
        self.welten
            .read()
            .values()
            .flat_map(|laeufe| laeufe.values())
            .flat_map(|teilnehmer| teilnehmer.values())
            .filter_map(|session| session.identitaet().map(ClientZusammenfassung::from))
            .collect()
    }

    /// Sucht eine Session ueber ihren vollstaendigen Schluessel
    pub fn suchen(
        &self,
        welt: &WeltId,
        lauf: &LaufId,
        teilnehmer: TeilnehmerId,
    ) -> Option<Arc<Session>> {
        self.welten
            .read()
            .get(welt)
            .and_then(|laeufe| laeufe.get(lauf))
            .and_then(|tabelle| tabelle.get(&teilnehmer))
            .cloned()
    }

    /// Anzahl registrierter Instanz-Clients
    pub fn anzahl(&self) -> usize {
        self.welten
            .read()
            .values()
            .flat_map(|laeufe| laeufe.values())
            .map(|teilnehmer| teilnehmer.len())
            .sum()
    }

    pub fn ist_leer(&self) -> bool {
        self.welten.read().is_empty()
    }

    /// Anzahl der Welten mit mindestens einem Client
    pub fn welt_anzahl(&self) -> usize {
        self.welten.read().len()
    }

    /// Anzahl der Laeufe einer Welt mit mindestens einem Client
    pub fn lauf_anzahl(&self, welt: &WeltId) -> usize {
        self.welten.read().get(welt).map_or(0, |laeufe| laeufe.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relay_core::Identitaet;
    use tokio::sync::mpsc;

    fn instanz(welt: &str, lauf: &str, teilnehmer: i64, name: &str) -> Arc<Session> {
        // Empfaenger wird verworfen, Senden ist fuer diese Tests egal
        let (tx, _rx) = mpsc::channel(1);
        let session = Session::neu(tx, None);
        let identitaet = Identitaet::neu(
            WeltId::neu(welt).unwrap(),
            LaufId::neu(lauf).unwrap(),
            TeilnehmerId::neu(teilnehmer).unwrap(),
            name,
        )
        .unwrap();
        assert!(session.als_instanz_registrieren(identitaet));
        Arc::new(session)
    }

    #[test]
    fn registrieren_und_suchen() {
        let registry = ConnectionRegistry::neu();
        let alice = instanz("w1", "j1", 1, "Alice");

        assert!(matches!(
            registry.registrieren(Arc::clone(&alice)),
            RegistrierErgebnis::Neu
        ));
        let gefunden = registry
            .suchen(
                &WeltId::neu("w1").unwrap(),
                &LaufId::neu("j1").unwrap(),
                TeilnehmerId::neu(1).unwrap(),
            )
            .unwrap();
        assert_eq!(gefunden.id(), alice.id());
        assert_eq!(registry.anzahl(), 1);
    }

    #[test]
    fn gleicher_schluessel_ersetzt() {
        let registry = ConnectionRegistry::neu();
        let alt = instanz("w1", "j1", 1, "Alice");
        let neu = instanz("w1", "j1", 1, "Alice");

        registry.registrieren(Arc::clone(&alt));
        match registry.registrieren(Arc::clone(&neu)) {
            RegistrierErgebnis::Ersetzt(verdraengt) => assert_eq!(verdraengt.id(), alt.id()),
            anderes => panic!("Ersetzt erwartet, erhalten: {anderes:?}"),
        }
        assert_eq!(registry.anzahl(), 1);

        // Die verdraengte Session darf den neuen Eintrag nicht entfernen
        assert!(!registry.abmelden(&alt));
        assert_eq!(registry.anzahl(), 1);
        assert!(registry.abmelden(&neu));
        assert!(registry.ist_leer());
    }

    #[test]
    fn abmelden_raeumt_leere_ebenen_auf() {
        let registry = ConnectionRegistry::neu();
        let a = instanz("w1", "j1", 1, "A");
        let b = instanz("w1", "j2", 2, "B");
        let c = instanz("w2", "j9", 3, "C");
        for s in [&a, &b, &c] {
            registry.registrieren(Arc::clone(s));
        }
        let w1 = WeltId::neu("w1").unwrap();
        assert_eq!(registry.welt_anzahl(), 2);
        assert_eq!(registry.lauf_anzahl(&w1), 2);

        assert!(registry.abmelden(&a));
        assert_eq!(registry.lauf_anzahl(&w1), 1);
        assert!(registry.abmelden(&b));
        assert_eq!(registry.lauf_anzahl(&w1), 0);
        assert_eq!(registry.welt_anzahl(), 1);

        // Zweites Abmelden ist wirkungslos
        assert!(!registry.abmelden(&b));
        assert_eq!(registry.anzahl(), 1);
    }

    #[test]
    fn geschlossene_session_wird_abgelehnt() {
        let registry = ConnectionRegistry::neu();
        let session = instanz("w1", "j1", 1, "Alice");
        session.schliessen();
        assert!(matches!(
            registry.registrieren(session),
            RegistrierErgebnis::Abgelehnt
        ));
        assert!(registry.ist_leer());
    }

    #[test]
    fn session_ohne_identitaet_wird_abgelehnt() {
        let registry = ConnectionRegistry::neu();
        let (tx, _rx) = mpsc::channel(1);
        let session = Arc::new(Session::neu(tx, None));
        assert!(matches!(
            registry.registrieren(Arc::clone(&session)),
            RegistrierErgebnis::Abgelehnt
        ));
        assert!(!registry.abmelden(&session));
    }

    #[test]
    fn zusammenfassungen_und_fuer_jeden() {
        let registry = ConnectionRegistry::neu();
        registry.registrieren(instanz("w1", "j1", 2, "Bob"));
        registry.registrieren(instanz("w1", "j1", 1, "Alice"));

        let liste = registry.zusammenfassungen();
        let namen: Vec<_> = liste.iter().map(|c| c.anzeigename.as_str()).collect();
        // Sortiert nach Teilnehmer-ID innerhalb eines Laufs
        assert_eq!(namen, ["Alice", "Bob"]);

        let mut besucht = 0;
        registry.fuer_jeden(|session| {
            registry.abmelden(session);
            besucht += 1;
        });
        assert_eq!(besucht, 2);
        assert!(registry.ist_leer());
    }
}
